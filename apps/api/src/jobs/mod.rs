// Job posting intake: scrape a URL to text, then extract a structured JobPosting.
// Extraction failure is fatal to an optimization run; nothing downstream runs without a posting.

pub mod extractor;
pub mod prompts;
pub mod scrape;

pub use extractor::{JobExtractionError, JobExtractor, LlmJobExtractor};
pub use scrape::{scrape_job_posting, ScrapeError};
