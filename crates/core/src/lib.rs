//! Studyboard core types and request validation

pub mod error;
pub mod requests;
pub mod types;
pub mod validation;

pub use error::{ValidationError, ValidationResult};
pub use requests::*;
pub use types::*;
pub use validation::Validate;
