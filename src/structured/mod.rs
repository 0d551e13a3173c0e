//! Structured output module for quizgen.
//!
//! Turns free-form model text into validated records:
//! - `RecordShape`: typed description of one record, rendered as an example schema
//! - `extract_array`: isolate the first balanced JSON array in a response
//! - `RecordValidator`: parse, shape and cardinality checks
//!
//! # Examples
//!
//! ```
//! use quizgen::structured::{extract_array, RecordShape, RecordValidator};
//!
//! let shape = RecordShape::new().text("question").text("answer");
//! let reply = r#"Sure! [{"question":"Q","answer":"A"}] Enjoy."#;
//!
//! let candidate = extract_array(reply).unwrap();
//! let records = RecordValidator::new(&shape)
//!     .expected_count(Some(1))
//!     .validate(candidate.as_str())
//!     .unwrap();
//!
//! assert_eq!(records[0]["answer"], "A");
//! ```

pub mod error;
pub mod extract;
pub mod shape;
pub mod validator;

// Re-export commonly used types
pub use error::ValidationError;
pub use extract::{extract_array, ExtractedArray};
pub use shape::{FieldKind, FieldSpec, RecordShape};
pub use validator::{FieldCheck, Record, RecordValidator};
