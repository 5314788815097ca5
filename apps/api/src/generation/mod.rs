// Candidate generation: resume + job + feedback → HTML body markup.
// All LLM calls go through llm_client; the optimization loop only sees the trait.

pub mod generator;
pub mod prompts;

pub use generator::{CandidateGenerator, Feedback, GenerationError, GenerationRequest, LlmCandidateGenerator};
