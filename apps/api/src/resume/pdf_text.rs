use anyhow::{anyhow, Result};
use tracing::info;

/// Extracts plain text from an uploaded PDF.
///
/// Parsing is CPU-bound, so it runs on the blocking pool.
pub async fn extract_pdf_text(bytes: Vec<u8>) -> Result<String> {
    let size = bytes.len();
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| anyhow!("PDF extraction task failed: {e}"))?
        .map_err(|e| anyhow!("Could not read PDF: {e}"))?;

    let text = text.trim().to_string();
    info!(bytes = size, chars = text.len(), "Extracted resume text from PDF");
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_garbage_bytes_are_an_error() {
        let result = extract_pdf_text(b"definitely not a pdf".to_vec()).await;
        assert!(result.is_err());
    }
}
