//! Candidate generation. One call produces one resume rendering attempt.
//!
//! The optimization loop drives this through [`CandidateGenerator`]; a failure is
//! reported back for that candidate only and never aborts the run.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::generation::prompts::{FEEDBACK_TEMPLATE, GENERATION_PROMPT_TEMPLATE, GENERATION_SYSTEM};
use crate::llm_client::prompts::{fill_template, NO_FABRICATION_INSTRUCTION};
use crate::llm_client::{LlmClient, LlmError};
use crate::models::{CandidateId, JobPosting, ResumeSource, ValidationResult};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("generator returned no markup")]
    EmptyMarkup,

    #[error("failed to serialize generation input: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Issues and suggestions carried from the best failing candidate into the next round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feedback {
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

impl Feedback {
    pub fn from_validation(validation: &ValidationResult) -> Self {
        Self {
            issues: validation.issues().map(str::to_string).collect(),
            suggestions: validation.suggestions().map(str::to_string).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty() && self.suggestions.is_empty()
    }
}

/// Everything a generator sees for one candidate.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub id: CandidateId,
    /// Candidates requested in this round. Lets a backend vary parallel attempts.
    pub round_size: u32,
    pub source: &'a ResumeSource,
    pub job: &'a JobPosting,
    pub feedback: &'a Feedback,
}

/// Produces candidate markup. Implementations must be safe to call concurrently.
#[async_trait]
pub trait CandidateGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, GenerationError>;
}

pub struct LlmCandidateGenerator {
    llm: LlmClient,
}

impl LlmCandidateGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl CandidateGenerator for LlmCandidateGenerator {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, GenerationError> {
        let prompt = build_generation_prompt(&request)?;
        let markup = self.llm.call_text(&prompt, GENERATION_SYSTEM).await?;

        if !markup.contains('<') {
            return Err(GenerationError::EmptyMarkup);
        }
        debug!(candidate = %request.id, chars = markup.len(), "Generated candidate markup");
        Ok(markup)
    }
}

fn build_generation_prompt(request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
    let job_json = serde_json::to_string_pretty(request.job)?;

    let feedback_block = if request.feedback.is_empty() {
        String::new()
    } else {
        fill_template(
            FEEDBACK_TEMPLATE,
            &[
                ("issues", bullet_list(&request.feedback.issues).as_str()),
                ("suggestions", bullet_list(&request.feedback.suggestions).as_str()),
            ],
        )
    };

    let variant_hint = if request.round_size > 1 {
        format!(
            "This is variant {} of {}. Make different emphasis and ordering choices than an obvious first draft.",
            request.id.slot + 1,
            request.round_size
        )
    } else {
        String::new()
    };

    Ok(fill_template(
        GENERATION_PROMPT_TEMPLATE,
        &[
            ("no_fabrication_instruction", NO_FABRICATION_INSTRUCTION),
            ("job_json", job_json.as_str()),
            ("resume_text", request.source.content()),
            ("feedback_block", feedback_block.as_str()),
            ("variant_hint", variant_hint.as_str()),
        ],
    ))
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "- (none)".to_string();
    }
    items
        .iter()
        .map(|i| format!("- {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FilterResult;

    fn job() -> JobPosting {
        JobPosting {
            title: "Rust Engineer".to_string(),
            company: "Ferrous Labs".to_string(),
            keywords: vec!["Tokio".to_string()],
            raw_text: "raw posting text".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_feedback_collects_issues_in_filter_order() {
        let validation = ValidationResult::from_results(vec![
            FilterResult::scored("a", 0.1, 0.5, vec!["a1".into()], vec!["sa".into()]),
            FilterResult::scored("b", 0.9, 0.5, vec!["b1".into(), "b2".into()], vec![]),
        ]);
        let fb = Feedback::from_validation(&validation);
        assert_eq!(fb.issues, vec!["a1", "b1", "b2"]);
        assert_eq!(fb.suggestions, vec!["sa"]);
        assert!(!fb.is_empty());
        assert!(Feedback::default().is_empty());
    }

    #[test]
    fn test_prompt_without_feedback_has_no_feedback_block() {
        let source = ResumeSource::new("Jane Doe — Rust, Tokio");
        let job = job();
        let feedback = Feedback::default();
        let prompt = build_generation_prompt(&GenerationRequest {
            id: CandidateId { round: 0, slot: 0 },
            round_size: 1,
            source: &source,
            job: &job,
            feedback: &feedback,
        })
        .unwrap();

        assert!(prompt.contains("Jane Doe — Rust, Tokio"));
        assert!(prompt.contains("Ferrous Labs"));
        assert!(!prompt.contains("failed review"));
        assert!(!prompt.contains("variant"));
        assert!(!prompt.contains("raw posting text"), "raw_text must not be sent");
        assert!(!prompt.contains("{job_json}"));
    }

    #[test]
    fn test_prompt_with_feedback_and_variant() {
        let source = ResumeSource::new("resume");
        let job = job();
        let feedback = Feedback {
            issues: vec!["Missing keyword: Tokio".to_string()],
            suggestions: vec![],
        };
        let prompt = build_generation_prompt(&GenerationRequest {
            id: CandidateId { round: 1, slot: 2 },
            round_size: 3,
            source: &source,
            job: &job,
            feedback: &feedback,
        })
        .unwrap();

        assert!(prompt.contains("- Missing keyword: Tokio"));
        assert!(prompt.contains("- (none)"));
        assert!(prompt.contains("variant 3 of 3"));
    }

    #[test]
    fn test_placeholder_text_in_user_input_stays_literal() {
        let source = ResumeSource::new("Notes: {feedback_block} {variant_hint} {job_json}");
        let mut job = job();
        job.title = "Engineer {resume_text}".to_string();
        let feedback = Feedback {
            issues: vec!["Missing keyword: {suggestions}".to_string()],
            suggestions: vec!["Add Tokio".to_string()],
        };
        let prompt = build_generation_prompt(&GenerationRequest {
            id: CandidateId { round: 1, slot: 0 },
            round_size: 2,
            source: &source,
            job: &job,
            feedback: &feedback,
        })
        .unwrap();

        assert!(prompt.contains("Notes: {feedback_block} {variant_hint} {job_json}"));
        assert!(prompt.contains("Engineer {resume_text}"));
        assert!(prompt.contains("- Missing keyword: {suggestions}"));
        assert!(prompt.contains("- Add Tokio"));
        assert_eq!(prompt.matches("Notes:").count(), 1);
    }
}
