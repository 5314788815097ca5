//! Filters: independent, pure scoring predicates over a rendered candidate.
//!
//! Every built-in filter scores on [0, 1] and passes at `score >= threshold`.
//! A filter that has nothing to measure returns a failing zero score with an
//! explanatory issue instead of erroring.
//!
//! The set is assembled once at startup ([`configured_filters`]); the validator
//! only sees `Arc<dyn Filter>`.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::OptimizerConfig;
use crate::html::list_items;
use crate::models::job::normalize;
use crate::models::{FilterResult, JobPosting, RenderedCandidate};

/// A single scoring predicate. Must be deterministic and side-effect free.
pub trait Filter: Send + Sync {
    /// Unique within a validator.
    fn name(&self) -> &str;

    fn evaluate(&self, candidate: &RenderedCandidate, job: &JobPosting) -> FilterResult;
}

/// Builds the filter set in evaluation order.
pub fn configured_filters(config: &OptimizerConfig) -> Vec<Arc<dyn Filter>> {
    vec![
        Arc::new(KeywordCoverageFilter {
            threshold: config.keyword_threshold,
        }),
        Arc::new(RequirementCoverageFilter {
            threshold: config.requirement_threshold,
        }),
        Arc::new(PageCountFilter {
            max_pages: config.max_pages,
        }),
        Arc::new(QuantifiedImpactFilter {
            threshold: config.impact_threshold,
        }),
    ]
}

// ────────────────────────────────────────────────────────────────────────────
// Keyword coverage
// ────────────────────────────────────────────────────────────────────────────

/// Fraction of the posting's keywords that appear in the resume text.
pub struct KeywordCoverageFilter {
    pub threshold: f64,
}

impl Filter for KeywordCoverageFilter {
    fn name(&self) -> &str {
        "keyword_coverage"
    }

    fn evaluate(&self, candidate: &RenderedCandidate, job: &JobPosting) -> FilterResult {
        let mut seen = HashSet::new();
        let keywords: Vec<&str> = job
            .keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty() && seen.insert(k.to_lowercase()))
            .collect();

        if keywords.is_empty() {
            return FilterResult::unscorable(
                self.name(),
                self.threshold,
                "Job posting lists no keywords; keyword coverage cannot be measured",
            );
        }

        let text = normalize(candidate.text());
        let missing: Vec<&str> = keywords
            .iter()
            .copied()
            .filter(|k| !contains_term(&text, &normalize(k)))
            .collect();

        let score = (keywords.len() - missing.len()) as f64 / keywords.len() as f64;

        let (issues, suggestions) = if missing.is_empty() {
            (vec![], vec![])
        } else {
            (
                vec![format!("Missing job keywords: {}", missing.join(", "))],
                vec![format!(
                    "Use the posting's exact wording for these where your experience supports it: {}",
                    missing.join(", ")
                )],
            )
        };

        FilterResult::scored(self.name(), score, self.threshold, issues, suggestions)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Requirement coverage
// ────────────────────────────────────────────────────────────────────────────

/// A requirement counts as covered when at least this share of its significant words appear.
const REQUIREMENT_WORD_COVERAGE: f64 = 0.5;
/// Uncovered requirements listed as issues, at most.
const MAX_REQUIREMENT_ISSUES: usize = 5;

const STOPWORDS: &[&str] = &[
    "and", "the", "for", "with", "you", "your", "our", "are", "have", "has", "will", "from",
    "that", "this", "who", "can", "able", "ability", "years", "year", "experience", "strong",
    "knowledge", "skills", "plus", "preferred", "required", "must", "etc", "work", "working",
    "good", "excellent", "understanding", "familiarity", "least",
];

/// Fraction of stated requirements the resume text gives evidence for.
pub struct RequirementCoverageFilter {
    pub threshold: f64,
}

impl Filter for RequirementCoverageFilter {
    fn name(&self) -> &str {
        "requirement_coverage"
    }

    fn evaluate(&self, candidate: &RenderedCandidate, job: &JobPosting) -> FilterResult {
        let text = normalize(candidate.text());

        let mut assessed = 0usize;
        let mut uncovered: Vec<&str> = Vec::new();

        for requirement in &job.requirements {
            let words = significant_words(requirement);
            if words.is_empty() {
                continue;
            }
            assessed += 1;
            let hits = words.iter().filter(|w| contains_term(&text, w)).count();
            if (hits as f64 / words.len() as f64) < REQUIREMENT_WORD_COVERAGE {
                uncovered.push(requirement.trim());
            }
        }

        if assessed == 0 {
            return FilterResult::unscorable(
                self.name(),
                self.threshold,
                "Job posting states no assessable requirements",
            );
        }

        let score = (assessed - uncovered.len()) as f64 / assessed as f64;
        let issues = uncovered
            .iter()
            .take(MAX_REQUIREMENT_ISSUES)
            .map(|r| format!("Requirement not evidenced: {r}"))
            .collect();
        let suggestions = uncovered
            .iter()
            .take(MAX_REQUIREMENT_ISSUES)
            .map(|r| format!("Surface existing experience that addresses: {r}"))
            .collect();

        FilterResult::scored(self.name(), score, self.threshold, issues, suggestions)
    }
}

/// Lowercased terms of three or more characters (or carrying `+`/`#`), minus
/// stopwords and bare numbers. Keeps short stack names like SQL and AWS.
fn significant_words(requirement: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    requirement
        .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() >= 3 || w.contains(['+', '#']))
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit() || c == '+'))
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Page count
// ────────────────────────────────────────────────────────────────────────────

/// 1.0 within the page budget, `max_pages / page_count` beyond it.
pub struct PageCountFilter {
    pub max_pages: u32,
}

impl Filter for PageCountFilter {
    fn name(&self) -> &str {
        "page_count"
    }

    fn evaluate(&self, candidate: &RenderedCandidate, _job: &JobPosting) -> FilterResult {
        let pages = candidate.page_count();
        if pages == 0 {
            return FilterResult::unscorable(self.name(), 1.0, "Rendered document reports zero pages");
        }

        let mut issues = Vec::new();
        let mut suggestions = Vec::new();
        let score = if pages <= self.max_pages {
            1.0
        } else {
            issues.push(format!("Resume is {pages} pages; the limit is {}", self.max_pages));
            suggestions.push(format!(
                "Cut to {} page(s): drop the weakest bullets and shorten long ones",
                self.max_pages
            ));
            self.max_pages as f64 / pages as f64
        };

        // renderer warnings travel with the page verdict
        for warning in &candidate.document.warnings {
            if !issues.contains(warning) {
                issues.push(warning.clone());
            }
        }

        FilterResult::scored(self.name(), score, 1.0, issues, suggestions)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Quantified impact
// ────────────────────────────────────────────────────────────────────────────

const VAGUE_VERBS: &[&str] = &[
    "improved", "enhanced", "helped", "worked on", "assisted", "supported", "participated",
    "involved",
];

const VAGUE_SCALE_WORDS: &[&str] = &[
    "significant", "major", "large", "huge", "massive", "substantial", "considerable", "many",
    "numerous", "various", "several",
];

/// Unquantified bullets quoted as issues, at most.
const MAX_IMPACT_ISSUES: usize = 3;

/// Fraction of bullet points that state a measurable result.
pub struct QuantifiedImpactFilter {
    pub threshold: f64,
}

impl Filter for QuantifiedImpactFilter {
    fn name(&self) -> &str {
        "quantified_impact"
    }

    fn evaluate(&self, candidate: &RenderedCandidate, _job: &JobPosting) -> FilterResult {
        let bullets = list_items(candidate.markup());
        if bullets.is_empty() {
            return FilterResult::unscorable(
                self.name(),
                self.threshold,
                "Resume has no bullet points to assess for measurable impact",
            );
        }

        let vague: Vec<&String> = bullets.iter().filter(|b| !is_quantified(b)).collect();
        let score = (bullets.len() - vague.len()) as f64 / bullets.len() as f64;

        let mut issues = Vec::new();
        let mut suggestions = Vec::new();
        for bullet in vague.iter().take(MAX_IMPACT_ISSUES) {
            issues.push(format!("Bullet has no measurable result: \"{}\"", preview(bullet)));
            let lower = bullet.to_lowercase();
            if let Some(verb) = VAGUE_VERBS.iter().find(|v| lower.contains(*v)) {
                let s = format!("Quantify '{verb}': how much, how many, how fast?");
                if !suggestions.contains(&s) {
                    suggestions.push(s);
                }
            }
            if let Some(word) = VAGUE_SCALE_WORDS.iter().find(|w| contains_term(&lower, w)) {
                let s = format!("Replace '{word}' with a specific number or percentage");
                if !suggestions.contains(&s) {
                    suggestions.push(s);
                }
            }
        }
        if !vague.is_empty() && suggestions.is_empty() {
            suggestions.push(
                "Add numbers, percentages, or time saved to bullets where the source resume supports them"
                    .to_string(),
            );
        }

        FilterResult::scored(self.name(), score, self.threshold, issues, suggestions)
    }
}

fn is_quantified(bullet: &str) -> bool {
    bullet.chars().any(|c| c.is_ascii_digit())
        || bullet.contains(['%', '$', '€', '£'])
}

fn preview(text: &str) -> String {
    const MAX: usize = 80;
    if text.chars().count() <= MAX {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX).collect();
    format!("{}…", cut.trim_end())
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// Whole-term match: `term` must not be glued to alphanumerics on either side,
/// so "go" does not match "google" and "c" does not match "cloud".
fn contains_term(haystack: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    haystack.match_indices(term).any(|(start, _)| {
        let end = start + term.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}
