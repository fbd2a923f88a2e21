mod common;

use std::sync::Arc;

use common::{MockRewriter, MockScorer};
use promptloops_core::{
    ControlConfig, Controller, Decision, DedupPolicy, InstructionPair, MemoryObservationLog,
    ObservationLog, Optimizer, TuningSession,
};
use promptloops_critic::{CritiqueRequest, DimensionScores, PerDimension, PreviousScores};
use promptloops_logging::Logger;
use promptloops_rewriter::DYNAMIC_SECTION_MARKER;

fn session() -> TuningSession {
    TuningSession::new(InstructionPair::new("AGENT BASE", "CRITIC BASE"))
}

fn request(previous: Option<[i32; 4]>) -> CritiqueRequest {
    CritiqueRequest {
        context: "repo uses make".into(),
        artifact: "sed -i 's/x/y/' main.c".into(),
        question: "fix the typo".into(),
        previous: match previous {
            Some(p) => PreviousScores::Scores(DimensionScores::new(p[0], p[1], p[2], p[3])),
            None => PreviousScores::NoPriorAttempt,
        },
        already_passed: false,
    }
}

fn controller<'a>(
    scorer: &'a MockScorer,
    rewriter: &'a MockRewriter,
    log: &'a dyn ObservationLog,
    config: ControlConfig,
) -> Controller<'a> {
    Controller::new(scorer, rewriter, log, config, Arc::new(Logger::silent()))
}

#[tokio::test]
async fn test_already_passed_short_circuits() {
    let scorer = MockScorer::new();
    let rewriter = MockRewriter::new("a", "c");
    let log = MemoryObservationLog::new();
    let controller = controller(&scorer, &rewriter, &log, ControlConfig::default());
    let mut session = session();

    let mut req = request(None);
    req.already_passed = true;
    let result = controller.turn(&mut session, req).await.unwrap();

    assert_eq!(result.decision, Decision::AlreadyPassed);
    assert!(result.critique_scores.is_none());
    assert!(result.improvement_scores.is_none());
    assert!(!result.optimized);
    assert_eq!(scorer.calls(), 0);
    assert_eq!(rewriter.calls(), 0);
    assert!(session.accumulator.is_empty());
    assert_eq!(session.turns(), 1);
}

#[tokio::test]
async fn test_first_turn_records_scores() {
    let scorer = MockScorer::new();
    scorer.push([40, -20, 10, 0], "");
    let rewriter = MockRewriter::new("a", "c");
    let log = MemoryObservationLog::new();
    let controller = controller(&scorer, &rewriter, &log, ControlConfig::default());
    let mut session = session();

    let result = controller.turn(&mut session, request(None)).await.unwrap();

    assert_eq!(result.decision, Decision::Continue);
    assert_eq!(
        result.critique_scores,
        Some(DimensionScores::new(40, -20, 10, 0))
    );
    assert_eq!(
        result.improvement_scores,
        Some(DimensionScores::new(61, 81, 91, 101))
    );
    assert!(!result.optimized);
    assert_eq!(session.accumulator.sums(), &PerDimension::new(40, -20, 10, 0));
    assert_eq!(session.accumulator.cycle_count(), 1);
    assert_eq!(scorer.seen_instructions.lock().unwrap()[0], "CRITIC BASE");
}

#[tokio::test]
async fn test_second_turn_reports_improvement() {
    let scorer = MockScorer::new();
    scorer.push([50, 30, 20, 20], "");
    scorer.push([30, 20, 20, 20], "");
    let rewriter = MockRewriter::new("a", "c");
    let log = MemoryObservationLog::new();
    let controller = controller(&scorer, &rewriter, &log, ControlConfig::default());
    let mut session = session();

    controller.turn(&mut session, request(None)).await.unwrap();
    let result = controller
        .turn(&mut session, request(Some([50, 30, 20, 20])))
        .await
        .unwrap();

    assert_eq!(
        result.improvement_scores,
        Some(DimensionScores::new(20, 10, 0, 0))
    );
    assert_eq!(result.decision, Decision::Continue);
    assert_eq!(session.accumulator.sums(), &PerDimension::new(80, 50, 40, 40));
}

#[tokio::test]
async fn test_optimizer_fires_early_on_large_error() {
    let scorer = MockScorer::new();
    scorer.push([90, -90, 90, -90], "");
    let rewriter = MockRewriter::new("Keep commands short.", " Penalize scope creep.");
    let log = MemoryObservationLog::new();
    let controller = controller(&scorer, &rewriter, &log, ControlConfig::default());
    let mut session = session();

    let result = controller.turn(&mut session, request(None)).await.unwrap();

    assert!(result.optimized);
    assert_eq!(rewriter.calls(), 1);
    let seen = rewriter.last();
    assert_eq!(seen.cycle_count, 1);
    assert_eq!(seen.accumulated, [90, -90, 90, -90]);
    assert_eq!(seen.aggressiveness, [9.0, 9.0, 9.0, 9.0]);
    assert_eq!(
        seen.agent_instructions,
        format!("AGENT BASE{}", DYNAMIC_SECTION_MARKER)
    );

    assert!(session.accumulator.is_empty());
    assert_eq!(session.accumulator.sums(), &PerDimension::default());
    assert_eq!(session.rewrites(), 1);
    assert_eq!(
        session.instructions.critic.render(),
        "CRITIC BASE Penalize scope creep."
    );
}

#[tokio::test]
async fn test_optimizer_fires_periodically_at_low_error() {
    let scorer = MockScorer::new();
    for _ in 0..5 {
        scorer.push([16, -16, 16, -16], "");
    }
    let rewriter = MockRewriter::new("a", "c");
    let log = MemoryObservationLog::new();
    let controller = controller(&scorer, &rewriter, &log, ControlConfig::default());
    let mut session = session();

    for turn in 0..4 {
        let result = controller.turn(&mut session, request(None)).await.unwrap();
        assert!(!result.optimized, "turn {} optimized too early", turn);
    }
    assert_eq!(session.accumulator.cycle_count(), 4);

    let result = controller.turn(&mut session, request(None)).await.unwrap();
    assert!(result.optimized);

    let seen = rewriter.last();
    assert_eq!(seen.cycle_count, 5);
    assert_eq!(seen.accumulated, [80, -80, 80, -80]);
    for value in seen.aggressiveness {
        assert!((value - 1.6).abs() < 1e-9);
    }
    assert!(session.accumulator.is_empty());
    assert_eq!(session.turns(), 5);
}

#[tokio::test]
async fn test_rewritten_critic_instructions_reach_scorer() {
    let scorer = MockScorer::new();
    scorer.push([90, 90, 90, 90], "");
    scorer.push([30, 30, 30, 30], "");
    let rewriter = MockRewriter::new("agent text", " critic text");
    let log = MemoryObservationLog::new();
    let controller = controller(&scorer, &rewriter, &log, ControlConfig::default());
    let mut session = session();

    controller.turn(&mut session, request(None)).await.unwrap();
    controller.turn(&mut session, request(None)).await.unwrap();

    let seen = scorer.seen_instructions.lock().unwrap();
    assert_eq!(seen[0], "CRITIC BASE");
    assert_eq!(seen[1], "CRITIC BASE critic text");
}

#[tokio::test]
async fn test_observations_feed_agent_dynamic_section() {
    let scorer = MockScorer::new();
    scorer.push([95, 95, 95, 95], "Quote file paths with spaces");
    let rewriter = MockRewriter::new("Prefer sed over ed.", "");
    let log = MemoryObservationLog::with_lines(vec!["Check exit codes".into()]);
    let controller = controller(&scorer, &rewriter, &log, ControlConfig::default());
    let mut session = session();

    let result = controller.turn(&mut session, request(None)).await.unwrap();

    assert_eq!(
        result.observation.as_deref(),
        Some("Quote file paths with spaces")
    );
    assert_eq!(
        rewriter.last().observations,
        vec!["Check exit codes", "Quote file paths with spaces"]
    );
    assert_eq!(
        session.instructions.agent.render(),
        "AGENT BASE\nCheck exit codes\nQuote file paths with spaces\nPrefer sed over ed."
    );
    assert_eq!(
        scorer.seen_observations.lock().unwrap()[0],
        vec!["Check exit codes"]
    );
}

#[tokio::test]
async fn test_optimizer_twice_without_record_does_not_duplicate() {
    let rewriter = MockRewriter::new("Stay in scope.", " Be strict.");
    let config = ControlConfig::default();
    let optimizer = Optimizer::new(&rewriter, &config);
    let mut session = session();
    let observations = vec!["rule".to_string()];

    optimizer.run(&mut session, &observations).await.unwrap();
    let once = session.instructions.clone();
    optimizer.run(&mut session, &observations).await.unwrap();

    assert_eq!(session.instructions, once);
    assert_eq!(session.instructions.agent.base(), "AGENT BASE");
    assert_eq!(
        session.instructions.agent.render().matches("Stay in scope.").count(),
        1
    );
    assert_eq!(rewriter.last().aggressiveness, [0.0; 4]);
    assert_eq!(session.rewrites(), 2);
}

#[tokio::test]
async fn test_optimizer_does_not_trigger_on_empty_accumulator() {
    let rewriter = MockRewriter::new("a", "c");
    let config = ControlConfig::default();
    let optimizer = Optimizer::new(&rewriter, &config);
    assert!(optimizer.should_run(&session().accumulator).is_none());
}

#[tokio::test]
async fn test_scorer_failure_leaves_session_unchanged() {
    let scorer = MockScorer::new();
    scorer.push([20, 20, 20, 20], "");
    scorer.push_failure();
    let rewriter = MockRewriter::new("a", "c");
    let log = MemoryObservationLog::new();
    let controller = controller(&scorer, &rewriter, &log, ControlConfig::default());
    let mut session = session();

    controller.turn(&mut session, request(None)).await.unwrap();
    let before = session.clone();

    let err = controller.turn(&mut session, request(None)).await.unwrap_err();
    assert!(err.to_string().contains("Scorer error"));
    assert_eq!(session.accumulator, before.accumulator);
    assert_eq!(session.instructions, before.instructions);
    assert_eq!(session.turns(), 1);
}

#[tokio::test]
async fn test_rewriter_failure_leaves_session_unchanged() {
    let scorer = MockScorer::new();
    scorer.push([99, 99, 99, 99], "");
    let rewriter = MockRewriter::failing();
    let log = MemoryObservationLog::new();
    let controller = controller(&scorer, &rewriter, &log, ControlConfig::default());
    let mut session = session();

    let err = controller.turn(&mut session, request(None)).await.unwrap_err();

    assert!(err.to_string().contains("Rewriter error"));
    assert_eq!(rewriter.calls(), 1);
    assert!(session.accumulator.is_empty());
    assert_eq!(session.instructions.critic.render(), "CRITIC BASE");
    assert_eq!(session.turns(), 0);
    assert_eq!(session.rewrites(), 0);
}

#[tokio::test]
async fn test_rewriter_failure_keeps_observation_out_of_log() {
    let scorer = MockScorer::new();
    scorer.push([99, 99, 99, 99], "Quote paths");
    let rewriter = MockRewriter::failing();
    let log = MemoryObservationLog::with_lines(vec!["Check exit codes".into()]);
    let controller = controller(&scorer, &rewriter, &log, ControlConfig::default());
    let mut session = session();

    assert!(controller.turn(&mut session, request(None)).await.is_err());

    assert_eq!(
        rewriter.last().observations,
        vec!["Check exit codes", "Quote paths"]
    );
    assert_eq!(log.read().unwrap(), vec!["Check exit codes"]);
    assert!(session.accumulator.is_empty());
}

#[tokio::test]
async fn test_malformed_request_rejected_before_mutation() {
    let scorer = MockScorer::new();
    let rewriter = MockRewriter::new("a", "c");
    let log = MemoryObservationLog::new();
    let controller = controller(&scorer, &rewriter, &log, ControlConfig::default());
    let mut session = session();

    let err = controller
        .turn_json(&mut session, r#"{"context": "x", "answer": 3}"#)
        .await
        .unwrap_err();
    assert!(err.is_request_error());

    let mixed = r#"{
        "context": "c", "answer": "a", "question": "q",
        "prev_correctness_score": 101, "prev_scope_score": 10,
        "prev_abstraction_score": 101, "prev_optimization_score": 101,
        "passed_all_tests_when_ran": false
    }"#;
    let err = controller.turn_json(&mut session, mixed).await.unwrap_err();
    assert!(err.is_request_error());

    assert_eq!(scorer.calls(), 0);
    assert!(session.accumulator.is_empty());
    assert_eq!(session.turns(), 0);
}

#[tokio::test]
async fn test_turn_json_first_attempt() {
    let scorer = MockScorer::new();
    scorer.push([5, 5, -5, 0], "");
    let rewriter = MockRewriter::new("a", "c");
    let log = MemoryObservationLog::new();
    let controller = controller(&scorer, &rewriter, &log, ControlConfig::default());
    let mut session = session();

    let json = r#"{
        "context": "c", "answer": "echo ok", "question": "q",
        "prev_correctness_score": 101, "prev_scope_score": 101,
        "prev_abstraction_score": 101, "prev_optimization_score": 101,
        "passed_all_tests_when_ran": false
    }"#;
    let result = controller.turn_json(&mut session, json).await.unwrap();
    assert_eq!(result.decision, Decision::StopSatisfied);
    assert_eq!(
        result.improvement_scores,
        Some(DimensionScores::new(96, 96, 96, 101))
    );
}

#[tokio::test]
async fn test_critic_dedup_appends_what_critic_returns() {
    let scorer = MockScorer::new();
    scorer.push([20, 20, 20, 20], "Check exit codes.");
    let rewriter = MockRewriter::new("a", "c");
    let log = MemoryObservationLog::with_lines(vec!["check exit codes".into()]);
    let controller = controller(&scorer, &rewriter, &log, ControlConfig::default());
    let mut session = session();

    let result = controller.turn(&mut session, request(None)).await.unwrap();

    assert_eq!(result.observation.as_deref(), Some("Check exit codes."));
    assert_eq!(log.read().unwrap().len(), 2);
}

#[tokio::test]
async fn test_store_dedup_skips_normalized_duplicates() {
    let scorer = MockScorer::new();
    scorer.push([20, 20, 20, 20], "Check  exit codes.");
    scorer.push([20, 20, 20, 20], "Quote paths");
    let rewriter = MockRewriter::new("a", "c");
    let log = MemoryObservationLog::with_lines(vec!["check exit codes".into()]);
    let config = ControlConfig {
        dedup: DedupPolicy::Store,
        ..ControlConfig::default()
    };
    let controller = controller(&scorer, &rewriter, &log, config);
    let mut session = session();

    let first = controller.turn(&mut session, request(None)).await.unwrap();
    let second = controller.turn(&mut session, request(None)).await.unwrap();

    assert!(first.observation.is_none());
    assert_eq!(second.observation.as_deref(), Some("Quote paths"));
    assert_eq!(log.read().unwrap(), vec!["check exit codes", "Quote paths"]);
}

#[tokio::test]
async fn test_empty_observation_not_recorded() {
    let scorer = MockScorer::new();
    scorer.push([20, 20, 20, 20], "");
    let rewriter = MockRewriter::new("a", "c");
    let log = MemoryObservationLog::new();
    let controller = controller(&scorer, &rewriter, &log, ControlConfig::default());
    let mut session = session();

    let result = controller.turn(&mut session, request(None)).await.unwrap();
    assert!(result.observation.is_none());
    assert!(log.read().unwrap().is_empty());
}

#[tokio::test]
async fn test_regression_stops() {
    let scorer = MockScorer::new();
    scorer.push([40, 20, 20, 20], "");
    let rewriter = MockRewriter::new("a", "c");
    let log = MemoryObservationLog::new();
    let controller = controller(&scorer, &rewriter, &log, ControlConfig::default());
    let mut session = session();

    let result = controller
        .turn(&mut session, request(Some([20, 20, 20, 20])))
        .await
        .unwrap();
    assert_eq!(result.decision, Decision::StopRegression);
    assert_eq!(session.accumulator.cycle_count(), 1);
}
