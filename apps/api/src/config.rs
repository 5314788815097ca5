use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::models::SelectionMetric;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
///
/// `anthropic_api_key` is optional: without it the service still starts, and
/// LLM-backed endpoints answer 503 until it is set.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub optimizer: OptimizerConfig,
    pub weasyprint_bin: String,
    pub render_timeout_secs: u64,
}

/// Knobs for the optimize-validate loop and its filter set.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    /// Default round budget when a request does not supply one.
    pub max_iterations: u32,
    /// Largest round budget a request may ask for.
    pub max_iterations_limit: u32,
    /// Candidates generated per round in parallel mode.
    pub parallel_candidates: u32,
    pub max_pages: u32,
    pub keyword_threshold: f64,
    pub requirement_threshold: f64,
    pub impact_threshold: f64,
    pub selection_metric: SelectionMetric,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            max_iterations_limit: 10,
            parallel_candidates: 3,
            max_pages: 1,
            keyword_threshold: 0.6,
            requirement_threshold: 0.5,
            impact_threshold: 0.5,
            selection_metric: SelectionMetric::Mean,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = OptimizerConfig::default();
        let optimizer = OptimizerConfig {
            max_iterations: positive(optional_env("MAX_ITERATIONS", defaults.max_iterations)?, "MAX_ITERATIONS")?,
            max_iterations_limit: positive(
                optional_env("MAX_ITERATIONS_LIMIT", defaults.max_iterations_limit)?,
                "MAX_ITERATIONS_LIMIT",
            )?,
            parallel_candidates: positive(
                optional_env("PARALLEL_CANDIDATES", defaults.parallel_candidates)?,
                "PARALLEL_CANDIDATES",
            )?,
            max_pages: positive(optional_env("MAX_PAGES", defaults.max_pages)?, "MAX_PAGES")?,
            keyword_threshold: optional_env("KEYWORD_THRESHOLD", defaults.keyword_threshold)?,
            requirement_threshold: optional_env("REQUIREMENT_THRESHOLD", defaults.requirement_threshold)?,
            impact_threshold: optional_env("IMPACT_THRESHOLD", defaults.impact_threshold)?,
            selection_metric: match std::env::var("SELECTION_METRIC") {
                Ok(v) => parse_selection_metric(&v)?,
                Err(_) => defaults.selection_metric,
            },
        };
        check_iteration_limit(&optimizer)?;

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            port: optional_env("PORT", 8080u16).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            optimizer,
            weasyprint_bin: std::env::var("WEASYPRINT_BIN").unwrap_or_else(|_| "weasyprint".to_string()),
            render_timeout_secs: optional_env("RENDER_TIMEOUT_SECS", 60u64)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

fn positive(value: u32, key: &str) -> Result<u32> {
    if value == 0 {
        bail!("Environment variable '{key}' must be at least 1");
    }
    Ok(value)
}

fn check_iteration_limit(optimizer: &OptimizerConfig) -> Result<()> {
    if optimizer.max_iterations > optimizer.max_iterations_limit {
        bail!(
            "MAX_ITERATIONS ({}) must not exceed MAX_ITERATIONS_LIMIT ({})",
            optimizer.max_iterations,
            optimizer.max_iterations_limit
        );
    }
    Ok(())
}

fn parse_selection_metric(raw: &str) -> Result<SelectionMetric> {
    match raw.trim().to_lowercase().as_str() {
        "mean" => Ok(SelectionMetric::Mean),
        "min" => Ok(SelectionMetric::Min),
        other => bail!("SELECTION_METRIC must be 'mean' or 'min', got '{other}'"),
    }
}
