//! Validation error types

use std::fmt;

/// Validation error for domain models
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Field is empty when it shouldn't be
    Empty { field: &'static str },

    /// An item of a comma-joined sequence contains the delimiter itself
    ContainsDelimiter { field: &'static str, value: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
            Self::ContainsDelimiter { field, value } => {
                write!(f, "{} '{}' must not contain ','", field, value)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ValidationError::ContainsDelimiter {
            field: "tone",
            value: "G,A".into(),
        };
        assert_eq!(err.to_string(), "tone 'G,A' must not contain ','");
    }
}
