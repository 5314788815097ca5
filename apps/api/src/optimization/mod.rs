// Optimize-validate loop: filters score a rendered candidate, the validator runs them all,
// and the optimizer drives rounds of generate → render → validate until one passes.

pub mod filters;
pub mod handlers;
pub mod optimizer;
pub mod validator;

pub use filters::configured_filters;
pub use optimizer::{JobInput, OptimizeError, OptimizeParams, Optimizer, RoundReport};
pub use validator::{Validator, ValidatorError};
