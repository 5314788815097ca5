//! Name extraction: best effort. Every failure degrades to "no name".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::llm_client::LlmClient;
use crate::resume::prompts::{NAME_EXTRACT_PROMPT_TEMPLATE, NAME_EXTRACT_SYSTEM};

/// Names appear at the top of a resume; there is no point sending the rest.
const NAME_CONTEXT_CHARS: usize = 2000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonName {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl PersonName {
    /// Trims both parts and turns blanks into `None`.
    fn cleaned(self) -> Self {
        let clean = |s: Option<String>| {
            s.map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty() && v.to_lowercase() != "null")
        };
        Self {
            first_name: clean(self.first_name),
            last_name: clean(self.last_name),
        }
    }
}

#[async_trait]
pub trait NameExtractor: Send + Sync {
    /// Never fails; unknown parts are `None`.
    async fn extract(&self, resume_text: &str) -> PersonName;
}

pub struct LlmNameExtractor {
    llm: LlmClient,
}

impl LlmNameExtractor {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl NameExtractor for LlmNameExtractor {
    async fn extract(&self, resume_text: &str) -> PersonName {
        let head: String = resume_text.chars().take(NAME_CONTEXT_CHARS).collect();
        if head.trim().is_empty() {
            return PersonName::default();
        }

        let prompt = NAME_EXTRACT_PROMPT_TEMPLATE.replace("{resume_text}", &head);
        match self.llm.call_json::<PersonName>(&prompt, NAME_EXTRACT_SYSTEM).await {
            Ok(name) => name.cleaned(),
            Err(e) => {
                warn!("Name extraction failed, continuing without a name: {e}");
                PersonName::default()
            }
        }
    }
}
