use crate::{Drift, Intensity, RewriteRequest};

/// Prompt templates for the instruction rewriter
pub struct RewriterPrompts;

impl RewriterPrompts {
    /// Standing instructions for the rewriter
    pub fn instructions() -> &'static str {
        r#"Your task: write prompt CORRECTIONS that replace the current dynamic section
of two instruction texts, one for the solving agent and one for the critic.

## Input

**Accumulated error** per dimension, summed over the critique cycle:
- Correctness: negative = broken commands, positive = excessive validation
- Scope: negative = missing requirements, positive = feature creep
- Abstraction: negative = messy code, positive = over-engineering
- Optimization: negative = wasteful operations, positive = premature optimization

**Aggressiveness** per dimension = abs(average error) / 10:
- 7-10: critical intervention; use strong, imperative language ("REQUIRED:")
- 3-7: moderate correction; use firm, clear instructions
- 0-3: minimal change; a gentle suggestion or nothing at all

**Cycle count**: critique turns since the last rewrite.

**Observations**: rules learned from past critiques. Repeated observations mean
the agent keeps making the same mistake; treat repetition as a reason to be
more forceful and more specific.

## Output

- agent_section: complete replacement for the agent's dynamic section.
  Negative error calls for instructions that correct the deficiency; positive
  error calls for instructions that curb the excess. 1-2 targeted fixes, under
  100 words.
- critic_section: complete replacement for the critic's dynamic section.
  Adjust penalty severity for the drifting dimensions. 1-2 adjustments, under
  80 words.
- reasoning: why these changes, under 50 words.

Your sections REPLACE the previous dynamic sections; do not repeat their text.
Be concise and specific: reference actual observations, one concrete
instruction per issue, no generic warnings. If every aggressiveness is below 3
and the observations show improvement, return empty strings for both
sections."#
    }

    /// Build the rewrite prompt for one optimization run
    pub fn build_rewrite_prompt(request: &RewriteRequest<'_>) -> String {
        let mut errors = String::new();
        for (dimension, drift, intensity) in request.guidance() {
            errors.push_str(&format!(
                "- {}: error {}, aggressiveness {:.1} ({}, {})\n",
                dimension,
                request.accumulated.get(dimension),
                request.aggressiveness.get(dimension),
                drift_label(drift),
                intensity_label(intensity),
            ));
        }

        let observations = if request.observations.is_empty() {
            "(none)".to_string()
        } else {
            request
                .observations
                .iter()
                .map(|o| format!("- {}", o))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            r#"{instructions}

---

## Current Agent Instructions
{agent}

## Current Critic Instructions
{critic}

## Accumulated Error And Aggressiveness
{errors}
## Cycle Count
{cycle_count}

## Observations
{observations}

---

End your response with exactly one rewrite block:

<rewrite>
{{"agent_section": "replacement text or empty", "critic_section": "replacement text or empty", "reasoning": "why"}}
</rewrite>"#,
            instructions = Self::instructions(),
            agent = request.agent_instructions,
            critic = request.critic_instructions,
            cycle_count = request.cycle_count,
        )
    }
}

fn drift_label(drift: Drift) -> &'static str {
    match drift {
        Drift::Deficiency => "deficient",
        Drift::Excess => "excessive",
        Drift::Balanced => "balanced",
    }
}

fn intensity_label(intensity: Intensity) -> &'static str {
    match intensity {
        Intensity::Minimal => "minimal change",
        Intensity::Firm => "firm correction",
        Intensity::Critical => "critical intervention",
    }
}
