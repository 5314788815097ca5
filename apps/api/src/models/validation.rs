use serde::{Deserialize, Serialize};

/// One filter's verdict on one candidate.
///
/// `score` and `threshold` are on the filter's own scale. Build through
/// [`FilterResult::scored`] so `passed` always agrees with them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterResult {
    pub filter_name: String,
    pub passed: bool,
    pub score: f64,
    pub threshold: f64,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

impl FilterResult {
    /// A result that passes when `score >= threshold`.
    pub fn scored(
        filter_name: impl Into<String>,
        score: f64,
        threshold: f64,
        issues: Vec<String>,
        suggestions: Vec<String>,
    ) -> Self {
        Self {
            filter_name: filter_name.into(),
            passed: score >= threshold,
            score,
            threshold,
            issues,
            suggestions,
        }
    }

    /// A failing zero-score result for inputs the filter cannot judge.
    pub fn unscorable(filter_name: impl Into<String>, threshold: f64, issue: impl Into<String>) -> Self {
        Self {
            filter_name: filter_name.into(),
            passed: false,
            score: 0.0,
            threshold,
            issues: vec![issue.into()],
            suggestions: vec![],
        }
    }
}

/// How a list of filter scores collapses into one number for candidate ranking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMetric {
    #[default]
    Mean,
    Min,
}

/// Aggregate verdict for one candidate. `results` keeps filter execution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    pub results: Vec<FilterResult>,
}

impl ValidationResult {
    pub fn from_results(results: Vec<FilterResult>) -> Self {
        Self {
            passed: results.iter().all(|r| r.passed),
            results,
        }
    }

    /// The verdict reported when no candidate ever rendered.
    pub fn nothing_rendered() -> Self {
        Self {
            passed: false,
            results: Vec::new(),
        }
    }

    /// Ranking score. An empty result list scores 0.
    pub fn aggregate_score(&self, metric: SelectionMetric) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        let scores = self.results.iter().map(|r| r.score);
        match metric {
            SelectionMetric::Mean => scores.sum::<f64>() / self.results.len() as f64,
            SelectionMetric::Min => scores.fold(f64::INFINITY, f64::min),
        }
    }

    pub fn issues(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .flat_map(|r| r.issues.iter().map(String::as_str))
    }

    pub fn suggestions(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .flat_map(|r| r.suggestions.iter().map(String::as_str))
    }
}
