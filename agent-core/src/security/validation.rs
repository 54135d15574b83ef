//! Input validation for invocation payloads

use thiserror::Error;

/// Longest prompt accepted at the HTTP boundary, in bytes.
pub const MAX_PROMPT_LENGTH: usize = 16_000;

/// Longest session identifier accepted, in bytes.
pub const MAX_SESSION_ID_LENGTH: usize = 128;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Input too long: max {max} bytes, got {actual}")]
    InputTooLong { max: usize, actual: usize },

    #[error("Invalid characters detected")]
    InvalidCharacters,

    #[error("Empty input not allowed")]
    EmptyInput,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Validate user input for security
pub fn validate_input(input: &str, max_length: usize) -> Result<(), ValidationError> {
    if input.trim().is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    if input.len() > max_length {
        return Err(ValidationError::InputTooLong {
            max: max_length,
            actual: input.len(),
        });
    }

    // Check for null bytes (potential injection)
    if input.contains('\0') {
        return Err(ValidationError::InvalidCharacters);
    }

    // Control characters other than newline, tab and carriage return
    if input.chars().any(|c| {
        c.is_control() && c != '\n' && c != '\t' && c != '\r'
    }) {
        return Err(ValidationError::InvalidCharacters);
    }

    Ok(())
}

/// Session ids end up in storage keys and memory namespaces, so keep them to a
/// conservative alphabet.
pub fn validate_session_id(session_id: &str) -> Result<(), ValidationError> {
    if session_id.is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    if session_id.len() > MAX_SESSION_ID_LENGTH {
        return Err(ValidationError::InputTooLong {
            max: MAX_SESSION_ID_LENGTH,
            actual: session_id.len(),
        });
    }

    if !session_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ValidationError::InvalidFormat(format!(
            "session id may only contain ASCII letters, digits, '-', '_' and '.': {}",
            session_id
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_input() {
        assert!(validate_input("hello", 100).is_ok());
        assert!(validate_input("line one\nline two\tend", 100).is_ok());
        assert_eq!(validate_input("", 100), Err(ValidationError::EmptyInput));
        assert_eq!(validate_input("   \n", 100), Err(ValidationError::EmptyInput));
        assert!(matches!(
            validate_input(&"a".repeat(101), 100),
            Err(ValidationError::InputTooLong { max: 100, actual: 101 })
        ));
    }

    #[test]
    fn test_length_is_measured_in_bytes() {
        // 60 two-byte characters
        let err = validate_input(&"é".repeat(60), 100).unwrap_err();
        assert_eq!(err, ValidationError::InputTooLong { max: 100, actual: 120 });
        assert_eq!(err.to_string(), "Input too long: max 100 bytes, got 120");
    }

    #[test]
    fn test_control_characters_rejected() {
        assert_eq!(validate_input("bad\0byte", 100), Err(ValidationError::InvalidCharacters));
        assert_eq!(validate_input("bell\u{7}", 100), Err(ValidationError::InvalidCharacters));
    }

    #[test]
    fn test_validate_session_id() {
        assert!(validate_session_id("default_session").is_ok());
        assert!(validate_session_id("session-3f2a9c.1").is_ok());
        assert!(validate_session_id("").is_err());
        assert!(validate_session_id("../etc").is_err());
        assert!(validate_session_id("has space").is_err());
        assert!(validate_session_id(&"s".repeat(129)).is_err());
    }
}
