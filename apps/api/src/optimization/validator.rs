//! Validator: runs the configured filters over one candidate and aggregates.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use crate::models::{JobPosting, RenderedCandidate, ValidationResult};
use crate::optimization::filters::Filter;

#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("validator needs at least one filter")]
    NoFilters,

    #[error("duplicate filter name '{0}'")]
    DuplicateFilter(String),
}

/// An ordered, name-unique set of filters.
#[derive(Clone)]
pub struct Validator {
    filters: Vec<Arc<dyn Filter>>,
}

impl Validator {
    pub fn new(filters: Vec<Arc<dyn Filter>>) -> Result<Self, ValidatorError> {
        if filters.is_empty() {
            return Err(ValidatorError::NoFilters);
        }
        let mut names = HashSet::new();
        for filter in &filters {
            if !names.insert(filter.name().to_string()) {
                return Err(ValidatorError::DuplicateFilter(filter.name().to_string()));
            }
        }
        Ok(Self { filters })
    }

    pub fn filter_names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Evaluates every filter in configured order. Pure: same inputs, same result.
    pub fn validate(&self, candidate: &RenderedCandidate, job: &JobPosting) -> ValidationResult {
        ValidationResult::from_results(
            self.filters
                .iter()
                .map(|f| f.evaluate(candidate, job))
                .collect(),
        )
    }
}
