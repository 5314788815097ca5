use std::fmt;

use serde::{Deserialize, Serialize};

use crate::html::visible_text;

/// Position of a candidate within a run: which round, which fan-out slot.
///
/// Ordering is generation order (round first, then slot), which is the tie-break
/// order for selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidateId {
    pub round: u32,
    pub slot: u32,
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}c{}", self.round, self.slot)
    }
}

/// One generated attempt, before rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: CandidateId,
    /// HTML body markup produced by the generator.
    pub markup: String,
}

/// Output of a successful render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    pub pdf_bytes: Vec<u8>,
    pub page_count: u32,
    pub warnings: Vec<String>,
}

/// A candidate that rendered successfully. Only these reach the validator.
#[derive(Debug, Clone)]
pub struct RenderedCandidate {
    pub candidate: Candidate,
    pub document: RenderOutput,
    text: String,
}

impl RenderedCandidate {
    pub fn new(candidate: Candidate, document: RenderOutput) -> Self {
        let text = visible_text(&candidate.markup);
        Self {
            candidate,
            document,
            text,
        }
    }

    pub fn id(&self) -> CandidateId {
        self.candidate.id
    }

    pub fn markup(&self) -> &str {
        &self.candidate.markup
    }

    /// Reader-visible text of the markup, computed once.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn page_count(&self) -> u32 {
        self.document.page_count
    }
}

/// The artifact surfaced to the caller at the end of a run.
#[derive(Debug, Clone)]
pub struct OptimizedResume {
    pub candidate_id: CandidateId,
    pub markup: String,
    pub pdf_bytes: Vec<u8>,
    pub page_count: u32,
    pub warnings: Vec<String>,
}

impl From<RenderedCandidate> for OptimizedResume {
    fn from(rendered: RenderedCandidate) -> Self {
        Self {
            candidate_id: rendered.candidate.id,
            markup: rendered.candidate.markup,
            pdf_bytes: rendered.document.pdf_bytes,
            page_count: rendered.document.page_count,
            warnings: rendered.document.warnings,
        }
    }
}
