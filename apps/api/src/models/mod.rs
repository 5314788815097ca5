pub mod candidate;
pub mod job;
pub mod resume;
pub mod validation;

pub use candidate::{Candidate, CandidateId, OptimizedResume, RenderOutput, RenderedCandidate};
pub use job::JobPosting;
pub use resume::{GeneratedResumeRow, ResumeSource};
pub use validation::{FilterResult, SelectionMetric, ValidationResult};
