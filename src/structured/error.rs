//! Error types for structured output validation.

use std::fmt;

/// Why an extracted candidate was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The candidate is not well-formed JSON.
    Parse {
        message: String,
        line: usize,
        column: usize,
    },
    /// Parsed, but the top-level value is not an array.
    NotArray { found: &'static str },
    /// An array element is not an object.
    NotObject { index: usize, found: &'static str },
    /// An element does not carry the declared fields.
    Field { index: usize, reason: String },
    /// The array length differs from the required count.
    Count { expected: usize, actual: usize },
}

impl ValidationError {
    pub(crate) fn parse(err: &serde_json::Error) -> Self {
        ValidationError::Parse {
            message: err.to_string(),
            line: err.line(),
            column: err.column(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Parse { message, .. } => write!(f, "malformed JSON: {}", message),
            ValidationError::NotArray { found } => {
                write!(f, "expected a JSON array, found {}", found)
            }
            ValidationError::NotObject { index, found } => {
                write!(f, "items[{}]: expected an object, found {}", index, found)
            }
            ValidationError::Field { index, reason } => write!(f, "items[{}]: {}", index, reason),
            ValidationError::Count { expected, actual } => {
                write!(f, "expected {} items, got {}", expected, actual)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            ValidationError::Count {
                expected: 3,
                actual: 2
            }
            .to_string(),
            "expected 3 items, got 2"
        );
        assert_eq!(
            ValidationError::NotObject {
                index: 1,
                found: "string"
            }
            .to_string(),
            "items[1]: expected an object, found string"
        );
    }

    #[test]
    fn test_parse_carries_position() {
        let err = serde_json::from_str::<serde_json::Value>("[1,\n 2,,]").unwrap_err();
        match ValidationError::parse(&err) {
            ValidationError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected {:?}", other),
        }
    }
}
