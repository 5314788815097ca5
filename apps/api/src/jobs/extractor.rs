//! Job extraction: turns free-text postings into a [`JobPosting`].
//!
//! The LLM backend is wrapped by a grounding pass ([`JobPosting::retain_grounded`])
//! so nothing that is absent from the source text survives extraction.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::jobs::prompts::{JOB_EXTRACT_PROMPT_TEMPLATE, JOB_EXTRACT_SYSTEM};
use crate::llm_client::{LlmClient, LlmError};
use crate::models::JobPosting;

#[derive(Debug, Error)]
pub enum JobExtractionError {
    #[error("job posting text is empty")]
    EmptyText,

    #[error("job extraction failed: {0}")]
    Llm(#[from] LlmError),
}

impl JobExtractionError {
    pub fn is_invalid_api_key(&self) -> bool {
        matches!(self, JobExtractionError::Llm(e) if e.is_invalid_api_key())
    }
}

/// Extracts a structured posting from raw text.
#[async_trait]
pub trait JobExtractor: Send + Sync {
    async fn extract(&self, raw_text: &str) -> Result<JobPosting, JobExtractionError>;
}

pub struct LlmJobExtractor {
    llm: LlmClient,
}

impl LlmJobExtractor {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl JobExtractor for LlmJobExtractor {
    async fn extract(&self, raw_text: &str) -> Result<JobPosting, JobExtractionError> {
        if raw_text.trim().is_empty() {
            return Err(JobExtractionError::EmptyText);
        }

        let prompt = JOB_EXTRACT_PROMPT_TEMPLATE.replace("{job_text}", raw_text);
        let mut job: JobPosting = self.llm.call_json(&prompt, JOB_EXTRACT_SYSTEM).await?;
        job.raw_text = raw_text.to_string();
        let job = job.retain_grounded();

        info!(
            title = %job.title,
            company = %job.company,
            requirements = job.requirements.len(),
            keywords = job.keywords.len(),
            "Job posting extracted"
        );
        Ok(job)
    }
}
