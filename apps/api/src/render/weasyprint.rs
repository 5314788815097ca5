//! WeasyPrint backend. Writes the wrapped HTML to a temp dir, runs
//! `weasyprint in.html out.pdf`, and counts pages of the result.
//!
//! The child is spawned with `kill_on_drop`, and the temp dir lives inside the
//! future, so abandoning a render (loop cancellation) kills the process and
//! removes its files.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::models::RenderOutput;
use crate::render::{page_warnings, RenderError, Renderer};

const WRAPPER_HTML: &str = include_str!("../../templates/resume_wrapper.html");
const BODY_PLACEHOLDER: &str = "{{BODY}}";

#[derive(Debug, Clone)]
pub struct WeasyPrintRenderer {
    bin: String,
    timeout: Duration,
}

impl WeasyPrintRenderer {
    pub fn new(bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Renderer for WeasyPrintRenderer {
    async fn render(&self, markup: &str) -> Result<RenderOutput, RenderError> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("resume.html");
        let output = dir.path().join("resume.pdf");
        tokio::fs::write(&input, wrap_body(markup)).await?;

        let child = Command::new(&self.bin)
            .arg(&input)
            .arg(&output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let result = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| RenderError::Timeout(self.timeout.as_secs()))?
            .map_err(|source| RenderError::Spawn {
                bin: self.bin.clone(),
                source,
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            warn!(status = %result.status, "WeasyPrint failed");
            return Err(RenderError::Failed {
                status: result.status.to_string(),
                stderr,
            });
        }

        let pdf_bytes = tokio::fs::read(&output).await?;
        let (pdf_bytes, page_count) = tokio::task::spawn_blocking(move || {
            let pages = count_pages(&pdf_bytes);
            pages.map(|p| (pdf_bytes, p))
        })
        .await
        .map_err(|e| RenderError::InvalidPdf(format!("page count task failed: {e}")))??;

        debug!(bytes = pdf_bytes.len(), page_count, "Rendered resume PDF");

        Ok(RenderOutput {
            pdf_bytes,
            page_count,
            warnings: page_warnings(page_count),
        })
    }
}

/// Places the body markup into the bundled wrapper document.
fn wrap_body(markup: &str) -> String {
    WRAPPER_HTML.replace(BODY_PLACEHOLDER, markup)
}

fn count_pages(pdf: &[u8]) -> Result<u32, RenderError> {
    let doc = lopdf::Document::load_mem(pdf).map_err(|e| RenderError::InvalidPdf(e.to_string()))?;
    let pages = doc.get_pages().len() as u32;
    if pages == 0 {
        return Err(RenderError::InvalidPdf("document has no pages".to_string()));
    }
    Ok(pages)
}
