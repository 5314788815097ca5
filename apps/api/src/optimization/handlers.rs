use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::header,
    response::Response,
    Json,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::errors::{AppError, API_KEY_INVALID_MSG};
use crate::jobs::{scrape_job_posting, JobExtractionError, ScrapeError};
use crate::models::{JobPosting, ResumeSource, ValidationResult};
use crate::optimization::{JobInput, OptimizeError, OptimizeParams, RoundReport};
use crate::resume::{extract_pdf_text, PersonName};
use crate::state::{AppState, LlmServices};

const BLOCKED_URL_MSG: &str = "Job URL blocked by bot protection. Paste job text instead.";

// ── request / response shapes ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ExtractNameRequest {
    pub content: String,
}

#[derive(Serialize)]
pub struct ParsePdfResponse {
    pub content: String,
}

#[derive(Deserialize)]
pub struct JobParseRequest {
    pub url: Option<String>,
    pub text: Option<String>,
}

#[derive(Deserialize)]
pub struct OptimizeRequest {
    pub resume_content: String,
    pub job_text: Option<String>,
    pub job_url: Option<String>,
    pub max_iterations: Option<u32>,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_parallel() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct OptimizeResponse {
    pub success: bool,
    pub pdf_base64: Option<String>,
    pub pdf_filename: Option<String>,
    pub validation: ValidationResult,
    pub job: JobPosting,
    pub rounds: Vec<RoundReport>,
    pub error: Option<String>,
}

impl OptimizeResponse {
    /// A run that could not produce a result; the caller sees `error`.
    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            pdf_base64: None,
            pdf_filename: None,
            validation: ValidationResult::nothing_rendered(),
            job: JobPosting::default(),
            rounds: Vec::new(),
            error: Some(error.into()),
        }
    }
}

#[derive(Serialize)]
pub struct HistoryItem {
    pub filename: String,
    pub company: String,
    pub job_title: String,
    pub timestamp: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub items: Vec<HistoryItem>,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub has_api_key: bool,
    pub max_iterations: u32,
    pub max_iterations_limit: u32,
    pub parallel_candidates: u32,
    pub output_bucket: String,
}

fn services(state: &AppState) -> Result<&LlmServices, AppError> {
    state.services.as_ref().ok_or_else(AppError::missing_api_key)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ── resume ──────────────────────────────────────────────────────────────────

/// POST /api/resume/extract-name
pub async fn handle_extract_name(
    State(state): State<AppState>,
    Json(req): Json<ExtractNameRequest>,
) -> Json<PersonName> {
    match &state.services {
        Some(services) => Json(services.name_extractor.extract(&req.content).await),
        None => Json(PersonName::default()),
    }
}

/// POST /api/resume/parse-pdf (multipart, field `file`)
pub async fn handle_parse_pdf(mut multipart: Multipart) -> Result<Json<ParsePdfResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let is_pdf = field
            .file_name()
            .map(|n| n.to_lowercase().ends_with(".pdf"))
            .unwrap_or(false);
        if !is_pdf {
            return Err(AppError::Validation("Expected a PDF file".to_string()));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;
        let content = extract_pdf_text(bytes.to_vec()).await?;
        return Ok(Json(ParsePdfResponse { content }));
    }

    Err(AppError::Validation("Missing 'file' field".to_string()))
}

// ── job ─────────────────────────────────────────────────────────────────────

/// POST /api/job/parse
pub async fn handle_parse_job(
    State(state): State<AppState>,
    Json(req): Json<JobParseRequest>,
) -> Result<Json<JobPosting>, AppError> {
    let services = services(&state)?;

    let job_text = match (non_blank(req.url), non_blank(req.text)) {
        (Some(_), Some(_)) => {
            return Err(AppError::Validation(
                "Provide either url or text, not both".to_string(),
            ))
        }
        (Some(url), None) => match scrape_job_posting(&state.http, &url).await {
            Ok(text) => text,
            Err(ScrapeError::Blocked) => {
                return Err(AppError::UnprocessableEntity(BLOCKED_URL_MSG.to_string()))
            }
            Err(e) => return Err(AppError::UnprocessableEntity(e.to_string())),
        },
        (None, Some(text)) => text,
        (None, None) => return Err(AppError::Validation("Provide url or text".to_string())),
    };

    match services.job_extractor.extract(&job_text).await {
        Ok(job) => Ok(Json(job)),
        Err(e) if e.is_invalid_api_key() => Err(AppError::invalid_api_key()),
        Err(JobExtractionError::EmptyText) => {
            Err(AppError::Validation("Job posting text is empty".to_string()))
        }
        Err(e) => Err(AppError::Llm(e.to_string())),
    }
}

// ── optimize ────────────────────────────────────────────────────────────────

/// POST /api/optimize
///
/// Scrape and run failures come back as `200` with `success: false` and `error` set;
/// only request problems and a missing API key are HTTP errors.
pub async fn handle_optimize(
    State(state): State<AppState>,
    Json(req): Json<OptimizeRequest>,
) -> Result<Json<OptimizeResponse>, AppError> {
    let services = services(&state)?;

    if req.resume_content.trim().is_empty() {
        return Err(AppError::Validation("resume_content is empty".to_string()));
    }
    let limit = state.config.optimizer.max_iterations_limit;
    if req.max_iterations.is_some_and(|n| n > limit) {
        return Err(AppError::Validation(format!(
            "max_iterations must be at most {limit}"
        )));
    }

    let job_text = match (non_blank(req.job_text), non_blank(req.job_url)) {
        (Some(text), _) => text,
        (None, Some(url)) => match scrape_job_posting(&state.http, &url).await {
            Ok(text) => text,
            Err(ScrapeError::Blocked) => return Ok(Json(OptimizeResponse::failed(BLOCKED_URL_MSG))),
            Err(e) => return Ok(Json(OptimizeResponse::failed(e.to_string()))),
        },
        (None, None) => return Err(AppError::Validation("Provide job_text or job_url".to_string())),
    };

    let name = services.name_extractor.extract(&req.resume_content).await;
    let source = ResumeSource::new(req.resume_content).with_name(name.first_name, name.last_name);

    let params = OptimizeParams {
        max_iterations: req
            .max_iterations
            .unwrap_or(state.config.optimizer.max_iterations),
        parallel: req.parallel,
    };

    let run = match services
        .optimizer
        .optimize(&source, JobInput::Text(job_text), params)
        .await
    {
        Ok(run) => run,
        Err(OptimizeError::InvalidIterations) => {
            return Err(AppError::Validation(
                "max_iterations must be at least 1".to_string(),
            ))
        }
        Err(e) => {
            error!("Optimize failed: {e}");
            let message = if e.is_invalid_api_key() {
                API_KEY_INVALID_MSG.to_string()
            } else {
                e.to_string()
            };
            return Ok(Json(OptimizeResponse::failed(message)));
        }
    };

    let mut pdf_base64 = None;
    let mut pdf_filename = None;
    if let Some(optimized) = &run.optimized {
        pdf_base64 = Some(base64::engine::general_purpose::STANDARD.encode(&optimized.pdf_bytes));
        match state.artifacts.save(&optimized.pdf_bytes, &source, &run.job).await {
            Ok(row) => pdf_filename = Some(row.filename),
            Err(e) => warn!(checksum = source.checksum(), "Could not persist optimized resume: {e}"),
        }
    }

    info!(
        passed = run.validation.passed,
        rounds = run.rounds.len(),
        filename = pdf_filename.as_deref().unwrap_or("-"),
        "Optimization finished"
    );

    Ok(Json(OptimizeResponse {
        success: run.validation.passed && run.optimized.is_some(),
        pdf_base64,
        pdf_filename,
        validation: run.validation,
        job: run.job,
        rounds: run.rounds,
        error: None,
    }))
}

// ── history / settings ──────────────────────────────────────────────────────

/// GET /api/history
pub async fn handle_history(State(state): State<AppState>) -> Result<Json<HistoryResponse>, AppError> {
    let items = state
        .artifacts
        .list()
        .await?
        .into_iter()
        .map(|row| HistoryItem {
            filename: row.filename,
            company: row.company,
            job_title: row.job_title,
            timestamp: row.created_at.to_rfc3339(),
            first_name: row.first_name,
            last_name: row.last_name,
        })
        .collect();
    Ok(Json(HistoryResponse { items }))
}

/// GET /api/history/download/:filename
pub async fn handle_download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let bytes = state.artifacts.fetch(&filename).await?;

    Response::builder()
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.into()))
}

/// GET /api/settings
pub async fn handle_settings(State(state): State<AppState>) -> Json<SettingsResponse> {
    Json(SettingsResponse {
        has_api_key: state.services.is_some(),
        max_iterations: state.config.optimizer.max_iterations,
        max_iterations_limit: state.config.optimizer.max_iterations_limit,
        parallel_candidates: state.config.optimizer.parallel_candidates,
        output_bucket: state.artifacts.bucket().to_string(),
    })
}
