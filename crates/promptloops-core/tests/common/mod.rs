#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use promptloops_critic::{Critique, DimensionScores, ScoreInput, ScoreParseError, Scorer, ScorerError};
use promptloops_rewriter::{Rewrite, RewriteError, RewriteRequest, Rewriter};

/// Scorer that replays queued critiques and records what it was shown
#[derive(Default)]
pub struct MockScorer {
    queue: Mutex<VecDeque<Result<Critique, ScorerError>>>,
    pub seen_instructions: Mutex<Vec<String>>,
    pub seen_observations: Mutex<Vec<Vec<String>>>,
}

impl MockScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, scores: [i32; 4], observation: &str) {
        self.queue.lock().unwrap().push_back(Ok(critique(scores, observation)));
    }

    pub fn push_failure(&self) {
        self.queue
            .lock()
            .unwrap()
            .push_back(Err(ScorerError::ParseError(ScoreParseError::NoCritiqueFound)));
    }

    pub fn calls(&self) -> usize {
        self.seen_instructions.lock().unwrap().len()
    }
}

#[async_trait]
impl Scorer for MockScorer {
    async fn score(&self, input: ScoreInput<'_>) -> Result<Critique, ScorerError> {
        self.seen_instructions
            .lock()
            .unwrap()
            .push(input.critic_instructions.to_string());
        self.seen_observations
            .lock()
            .unwrap()
            .push(input.observations.to_vec());
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .expect("MockScorer queue exhausted")
    }
}

pub fn critique(scores: [i32; 4], observation: &str) -> Critique {
    Critique {
        scores: DimensionScores::new(scores[0], scores[1], scores[2], scores[3]),
        feedback: format!("feedback for {:?}", scores),
        observation: observation.to_string(),
    }
}

/// Snapshot of one rewrite request
#[derive(Debug, Clone)]
pub struct SeenRewrite {
    pub agent_instructions: String,
    pub critic_instructions: String,
    pub accumulated: [i64; 4],
    pub aggressiveness: [f64; 4],
    pub cycle_count: u32,
    pub observations: Vec<String>,
}

/// Rewriter returning a fixed rewrite, or failing when asked to
pub struct MockRewriter {
    rewrite: Rewrite,
    fail: bool,
    pub seen: Mutex<Vec<SeenRewrite>>,
}

impl MockRewriter {
    pub fn new(agent_section: &str, critic_section: &str) -> Self {
        Self {
            rewrite: Rewrite {
                agent_section: agent_section.to_string(),
                critic_section: critic_section.to_string(),
                reasoning: "mock".to_string(),
            },
            fail: false,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("", "")
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn last(&self) -> SeenRewrite {
        self.seen.lock().unwrap().last().cloned().expect("no rewrite seen")
    }
}

#[async_trait]
impl Rewriter for MockRewriter {
    async fn rewrite(&self, request: RewriteRequest<'_>) -> Result<Rewrite, RewriteError> {
        let acc = request.accumulated;
        let agg = request.aggressiveness;
        self.seen.lock().unwrap().push(SeenRewrite {
            agent_instructions: request.agent_instructions.to_string(),
            critic_instructions: request.critic_instructions.to_string(),
            accumulated: [acc.correctness, acc.scope, acc.abstraction, acc.optimization],
            aggressiveness: [agg.correctness, agg.scope, agg.abstraction, agg.optimization],
            cycle_count: request.cycle_count,
            observations: request.observations.to_vec(),
        });

        if self.fail {
            Err(RewriteError::AgentError("rewriter offline".into()))
        } else {
            Ok(self.rewrite.clone())
        }
    }
}
