use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use uuid::Uuid;

/// The candidate's input resume.
///
/// `checksum` is the SHA-256 of `content`, fixed at construction. Both are private
/// so neither can drift from the other afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeSource {
    content: String,
    checksum: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl ResumeSource {
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let checksum = hex::encode(Sha256::digest(content.as_bytes()));
        Self {
            content,
            checksum,
            first_name: None,
            last_name: None,
        }
    }

    pub fn with_name(mut self, first_name: Option<String>, last_name: Option<String>) -> Self {
        self.first_name = first_name;
        self.last_name = last_name;
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }
}

/// One persisted optimization artifact (`generated_resumes` table).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GeneratedResumeRow {
    pub id: Uuid,
    pub filename: String,
    pub s3_key: String,
    pub source_checksum: String,
    pub company: String,
    pub job_title: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
}
