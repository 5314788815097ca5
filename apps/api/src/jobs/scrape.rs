//! Fetches a job posting page and reduces it to readable text.

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{info, warn};

use crate::html::visible_text;

/// Postings shorter than this after stripping are treated as empty shells
/// (JS-only pages, consent walls).
const MIN_POSTING_CHARS: usize = 200;

const BOT_WALL_MARKERS: &[&str] = &[
    "cf-browser-verification",
    "cf-chl-",
    "challenge-platform",
    "just a moment...",
    "attention required! | cloudflare",
    "checking your browser",
];

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid job URL: {0}")]
    InvalidUrl(String),

    #[error("job URL blocked by bot protection")]
    Blocked,

    #[error("failed to fetch job URL: {0}")]
    Http(#[from] reqwest::Error),

    #[error("job URL returned status {0}")]
    Status(u16),

    #[error("job page had no readable posting text")]
    Empty,
}

/// Downloads `url` and returns its visible text.
pub async fn scrape_job_posting(client: &Client, url: &str) -> Result<String, ScrapeError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| ScrapeError::InvalidUrl(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ScrapeError::InvalidUrl(format!(
            "unsupported scheme '{}'",
            parsed.scheme()
        )));
    }

    let response = client
        .get(parsed)
        .header("user-agent", "Mozilla/5.0 (compatible; tailor-api/0.1)")
        .send()
        .await?;
    let status = response.status();
    let body = response.text().await?;

    if looks_blocked(status, &body) {
        warn!(url, status = status.as_u16(), "Job page is behind bot protection");
        return Err(ScrapeError::Blocked);
    }
    if !status.is_success() {
        return Err(ScrapeError::Status(status.as_u16()));
    }

    let text = visible_text(&body);
    if text.chars().count() < MIN_POSTING_CHARS {
        return Err(ScrapeError::Empty);
    }

    info!(url, chars = text.len(), "Scraped job posting");
    Ok(text)
}

fn looks_blocked(status: StatusCode, body: &str) -> bool {
    if !matches!(status.as_u16(), 403 | 429 | 503) {
        return false;
    }
    let lower = body.to_lowercase();
    BOT_WALL_MARKERS.iter().any(|m| lower.contains(m))
}
