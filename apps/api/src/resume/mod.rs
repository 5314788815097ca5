// Resume intake helpers: PDF text extraction and best-effort name extraction.
// Names are used only for output file naming, never for optimization decisions.

pub mod names;
pub mod pdf_text;
pub mod prompts;

pub use names::{LlmNameExtractor, NameExtractor, PersonName};
pub use pdf_text::extract_pdf_text;
