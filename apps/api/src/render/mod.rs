// Rendering: resume body markup → paginated PDF.
// The optimization loop only depends on the `Renderer` trait; the WeasyPrint
// backend shells out and must release its process and temp files when dropped.

pub mod weasyprint;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::RenderOutput;

pub use weasyprint::WeasyPrintRenderer;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("renderer binary '{bin}' could not be started: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("renderer exited with status {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("renderer timed out after {0}s")]
    Timeout(u64),

    #[error("render I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("renderer produced an unreadable PDF: {0}")]
    InvalidPdf(String),
}

/// Renders candidate markup into a document artifact.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, markup: &str) -> Result<RenderOutput, RenderError>;
}

/// Warnings attached to every successful render.
pub fn page_warnings(page_count: u32) -> Vec<String> {
    if page_count > 1 {
        vec![format!("Resume is {page_count} pages, should be 1 page")]
    } else {
        vec![]
    }
}
