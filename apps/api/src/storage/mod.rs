// Artifact persistence: PDF bytes in S3 under `resumes/`, one `generated_resumes` row per artifact.

use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::{GeneratedResumeRow, JobPosting, ResumeSource};

const KEY_PREFIX: &str = "resumes";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid filename: {0}")]
    InvalidFilename(String),

    #[error("artifact '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("S3 {op} failed for '{key}': {message}")]
    S3 {
        op: &'static str,
        key: String,
        message: String,
    },
}

/// S3 + Postgres store for optimized resume PDFs.
#[derive(Clone)]
pub struct ArtifactStore {
    db: PgPool,
    s3: aws_sdk_s3::Client,
    bucket: String,
}

impl ArtifactStore {
    pub fn new(db: PgPool, s3: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            db,
            s3,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Uploads `pdf_bytes` and records it. The filename is derived from the
    /// candidate's name and the job, stamped with the current UTC time and the
    /// row id, so two runs in the same second never share an S3 key.
    pub async fn save(
        &self,
        pdf_bytes: &[u8],
        source: &ResumeSource,
        job: &JobPosting,
    ) -> Result<GeneratedResumeRow, StorageError> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let filename = artifact_filename(
            source.first_name.as_deref(),
            source.last_name.as_deref(),
            &job.company,
            &job.title,
            created_at,
            id,
        );
        let s3_key = object_key(&filename);

        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(&s3_key)
            .body(ByteStream::from(pdf_bytes.to_vec()))
            .content_type("application/pdf")
            .send()
            .await
            .map_err(|e| StorageError::S3 {
                op: "upload",
                key: s3_key.clone(),
                message: e.to_string(),
            })?;

        info!(bucket = %self.bucket, key = %s3_key, bytes = pdf_bytes.len(), "Uploaded resume PDF");

        let row = GeneratedResumeRow {
            id,
            filename,
            s3_key,
            source_checksum: source.checksum().to_string(),
            company: job.company.clone(),
            job_title: job.title.clone(),
            first_name: source.first_name.clone(),
            last_name: source.last_name.clone(),
            created_at,
        };

        sqlx::query(
            r#"
            INSERT INTO generated_resumes
                (id, filename, s3_key, source_checksum, company, job_title,
                 first_name, last_name, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(row.id)
        .bind(&row.filename)
        .bind(&row.s3_key)
        .bind(&row.source_checksum)
        .bind(&row.company)
        .bind(&row.job_title)
        .bind(&row.first_name)
        .bind(&row.last_name)
        .bind(row.created_at)
        .execute(&self.db)
        .await?;

        Ok(row)
    }

    /// Every recorded artifact, newest first.
    pub async fn list(&self) -> Result<Vec<GeneratedResumeRow>, StorageError> {
        Ok(sqlx::query_as::<_, GeneratedResumeRow>(
            "SELECT * FROM generated_resumes ORDER BY created_at DESC",
        )
        .fetch_all(&self.db)
        .await?)
    }

    /// PDF bytes for a recorded artifact.
    pub async fn fetch(&self, filename: &str) -> Result<Vec<u8>, StorageError> {
        check_filename(filename)?;

        let row: Option<GeneratedResumeRow> =
            sqlx::query_as("SELECT * FROM generated_resumes WHERE filename = $1")
                .bind(filename)
                .fetch_optional(&self.db)
                .await?;
        let row = row.ok_or_else(|| StorageError::NotFound(filename.to_string()))?;

        let object = self
            .s3
            .get_object()
            .bucket(&self.bucket)
            .key(&row.s3_key)
            .send()
            .await
            .map_err(|e| StorageError::S3 {
                op: "download",
                key: row.s3_key.clone(),
                message: e.to_string(),
            })?;

        let bytes = object.body.collect().await.map_err(|e| StorageError::S3 {
            op: "read",
            key: row.s3_key.clone(),
            message: e.to_string(),
        })?;
        Ok(bytes.into_bytes().to_vec())
    }
}

/// Rejects anything that could name a path outside the artifact prefix.
pub fn check_filename(filename: &str) -> Result<(), StorageError> {
    if filename.is_empty() || filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err(StorageError::InvalidFilename(filename.to_string()));
    }
    Ok(())
}

fn object_key(filename: &str) -> String {
    format!("{KEY_PREFIX}/{filename}")
}

/// `first_last_company_title_YYYYMMDD_HHMMSS_<id8>.pdf`, empty parts skipped.
pub fn artifact_filename(
    first_name: Option<&str>,
    last_name: Option<&str>,
    company: &str,
    title: &str,
    at: DateTime<Utc>,
    id: Uuid,
) -> String {
    let parts: Vec<String> = [first_name.unwrap_or(""), last_name.unwrap_or(""), company, title]
        .iter()
        .map(|p| slug(p))
        .filter(|p| !p.is_empty())
        .collect();

    let stem = if parts.is_empty() {
        "resume".to_string()
    } else {
        parts.join("_")
    };
    let suffix = &id.simple().to_string()[..8];
    format!("{stem}_{}_{suffix}.pdf", at.format("%Y%m%d_%H%M%S"))
}

/// Lowercase ASCII alphanumerics; every other run of characters becomes one `-`.
fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    fn id() -> Uuid {
        Uuid::parse_str("3f2a9c1e-0000-4000-8000-000000000000").unwrap()
    }

    #[test]
    fn test_filename_uses_all_parts() {
        let name = artifact_filename(Some("Jane"), Some("Doe"), "Ferrous Labs", "Senior Rust Engineer", at(), id());
        assert_eq!(name, "jane_doe_ferrous-labs_senior-rust-engineer_20260314_092653_3f2a9c1e.pdf");
    }

    #[test]
    fn test_filename_skips_empty_parts() {
        let name = artifact_filename(None, Some("Doe"), "", "Engineer (Backend)", at(), id());
        assert_eq!(name, "doe_engineer-backend_20260314_092653_3f2a9c1e.pdf");
    }

    #[test]
    fn test_filename_falls_back_to_resume() {
        let name = artifact_filename(None, None, "  ", "!!!", at(), id());
        assert_eq!(name, "resume_20260314_092653_3f2a9c1e.pdf");
    }

    #[test]
    fn test_generated_filenames_pass_the_check() {
        let name = artifact_filename(Some("A/B"), Some("..\\C"), "x/../y", "t", at(), id());
        assert!(check_filename(&name).is_ok(), "{name}");
    }

    #[test]
    fn test_same_second_runs_get_distinct_keys() {
        let other = Uuid::parse_str("9b41d0aa-0000-4000-8000-000000000000").unwrap();
        let a = artifact_filename(Some("Jane"), Some("Doe"), "Acme", "Eng", at(), id());
        let b = artifact_filename(Some("Jane"), Some("Doe"), "Acme", "Eng", at(), other);
        assert_ne!(a, b);
        assert_ne!(object_key(&a), object_key(&b));
    }

    #[test]
    fn test_check_filename_rejects_traversal() {
        for bad in ["", "../etc/passwd", "a/b.pdf", "a\\b.pdf", "..pdf"] {
            assert!(
                matches!(check_filename(bad), Err(StorageError::InvalidFilename(_))),
                "{bad}"
            );
        }
        assert!(check_filename("jane_doe_20260314_092653.pdf").is_ok());
    }

    #[test]
    fn test_object_key_prefix() {
        assert_eq!(object_key("x.pdf"), "resumes/x.pdf");
    }
}
