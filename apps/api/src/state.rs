use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::jobs::{JobExtractor, LlmJobExtractor};
use crate::generation::LlmCandidateGenerator;
use crate::llm_client::LlmClient;
use crate::optimization::{configured_filters, Optimizer, Validator, ValidatorError};
use crate::render::weasyprint::WeasyPrintRenderer;
use crate::resume::{LlmNameExtractor, NameExtractor};
use crate::storage::ArtifactStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub artifacts: ArtifactStore,
    /// Plain HTTP client for job-URL scraping. LLM traffic has its own client.
    pub http: reqwest::Client,
    pub config: Config,
    /// `None` when `ANTHROPIC_API_KEY` is unset; LLM-backed endpoints answer 503.
    pub services: Option<LlmServices>,
}

/// Everything that needs the LLM, built once at startup.
#[derive(Clone)]
pub struct LlmServices {
    pub job_extractor: Arc<dyn JobExtractor>,
    pub name_extractor: Arc<dyn NameExtractor>,
    pub optimizer: Optimizer,
}

impl LlmServices {
    pub fn build(api_key: String, config: &Config) -> Result<Self, ValidatorError> {
        let llm = LlmClient::new(api_key);
        let job_extractor: Arc<dyn JobExtractor> = Arc::new(LlmJobExtractor::new(llm.clone()));

        let validator = Validator::new(configured_filters(&config.optimizer))?;
        let renderer = WeasyPrintRenderer::new(
            config.weasyprint_bin.clone(),
            Duration::from_secs(config.render_timeout_secs),
        );

        let optimizer = Optimizer::new(
            Arc::clone(&job_extractor),
            Arc::new(LlmCandidateGenerator::new(llm.clone())),
            Arc::new(renderer),
            Arc::new(validator),
        )
        .with_fan_out(config.optimizer.parallel_candidates)
        .with_selection_metric(config.optimizer.selection_metric);

        Ok(Self {
            job_extractor,
            name_extractor: Arc::new(LlmNameExtractor::new(llm)),
            optimizer,
        })
    }
}
