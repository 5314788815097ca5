use serde::{Deserialize, Serialize};

/// Structured job posting. An empty string or list means "not stated in the source".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobPosting {
    pub title: String,
    pub company: String,
    pub requirements: Vec<String>,
    pub keywords: Vec<String>,
    pub description: String,
    /// The text the posting was extracted from. Never sent back to clients.
    #[serde(skip_serializing)]
    pub raw_text: String,
}

impl JobPosting {
    /// Drops anything the extractor could not have copied from `raw_text`.
    ///
    /// - `description` survives only if it appears verbatim (modulo case and whitespace).
    /// - `keywords` must each appear in the source.
    /// - blank and duplicate list items are removed, first occurrence wins.
    pub fn retain_grounded(mut self) -> Self {
        let source = normalize(&self.raw_text);

        let description = normalize(&self.description);
        if description.is_empty() || !source.contains(&description) {
            self.description = String::new();
        }

        self.keywords = dedup_nonblank(self.keywords)
            .into_iter()
            .filter(|k| source.contains(&normalize(k)))
            .collect();
        self.requirements = dedup_nonblank(self.requirements);
        self.title = self.title.trim().to_string();
        self.company = self.company.trim().to_string();
        self
    }
}

/// Lowercases and collapses whitespace runs to single spaces.
pub(crate) fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn dedup_nonblank(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
        .collect()
}
