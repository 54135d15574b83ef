/// Security module for input validation

pub mod validation;

pub use validation::{validate_input, validate_session_id, ValidationError, MAX_PROMPT_LENGTH};
