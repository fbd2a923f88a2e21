use crate::{CritiqueRequest, Dimension, PreviousScores};

/// Prompt templates for the scorer
pub struct CriticPrompts;

impl CriticPrompts {
    /// Static base instructions for the critic.
    ///
    /// This is the immutable part of the critic instructions; the optimizer
    /// only ever replaces the dynamic section that follows it.
    pub fn base_instructions() -> String {
        let mut scale = String::new();
        for (i, dimension) in Dimension::ALL.iter().enumerate() {
            scale.push_str(&format!(
                "{n}. {name} (-100 to +100)\n   -100: {deficiency}\n   0: ideal\n   +100: {excess}\n\n",
                n = i + 1,
                name = capitalize(dimension.as_str()),
                deficiency = dimension.deficiency(),
                excess = dimension.excess(),
            ));
        }

        format!(
            r#"You evaluate a candidate solution to a software engineering task.
The solution should be the minimal set of shell commands that resolves the issue,
with no explanatory prose.

Score it on each of the following dimensions. Negative means the solution falls
short, positive means it overshoots, zero is ideal.

{scale}Explain your scores in the feedback.

Then write ONE observation: a single-line actionable rule addressing the most
critical issue you found, phrased as a direct instruction (for example "Escape
special characters in grep patterns"). Keep it under 15 words."#
        )
    }

    /// Build the full scoring prompt for one request
    pub fn build_scoring_prompt(
        critic_instructions: &str,
        request: &CritiqueRequest,
        observations: &[String],
    ) -> String {
        let previous = match request.previous {
            PreviousScores::NoPriorAttempt => "none (first attempt)".to_string(),
            PreviousScores::Scores(scores) => format!(
                "correctness {}, scope {}, abstraction {}, optimization {}",
                scores.correctness, scores.scope, scores.abstraction, scores.optimization
            ),
        };

        let known = if observations.is_empty() {
            "(none yet)".to_string()
        } else {
            observations
                .iter()
                .map(|o| format!("- {}", o))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            r#"{instructions}

---

## Repository Issue
{question}

## Repository Context
{context}

## Proposed Solution
```bash
{artifact}
```

## Previous Attempt Scores
{previous}

## Existing Observations
{known}

If your observation is already covered by an existing observation, return an
empty string for "observation".

---

## Required Response Format

End your response with exactly one critique block:

<critique>
{{"correctness": 0, "scope": 0, "abstraction": 0, "optimization": 0, "feedback": "What is wrong and how to fix it", "observation": "One new rule, or empty"}}
</critique>"#,
            instructions = critic_instructions,
            question = request.question,
            context = truncate_output(&request.context, 20000),
            artifact = truncate_output(&request.artifact, 10000),
        )
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn truncate_output(output: &str, max_len: usize) -> &str {
    if output.len() <= max_len {
        return output;
    }
    let mut cut = max_len;
    while !output.is_char_boundary(cut) {
        cut -= 1;
    }
    match output[..cut].rfind('\n') {
        Some(pos) => &output[..pos],
        None => &output[..cut],
    }
}
