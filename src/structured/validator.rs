//! Parse, shape and cardinality checks for an extracted candidate.

use serde_json::{Map, Value};

use super::error::{json_type_name, ValidationError};
use super::shape::RecordShape;

/// One generated record: field name to value, in the order the model wrote them.
pub type Record = Map<String, Value>;

/// How strictly array elements are checked against the requested shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldCheck {
    /// Elements must be objects; field names and values are trusted.
    #[default]
    Objects,
    /// Elements must also carry every declared field with a value of the declared kind.
    Keys,
}

/// Validates candidate text against a shape and an optional exact count.
#[derive(Debug, Clone, Copy)]
pub struct RecordValidator<'a> {
    shape: &'a RecordShape,
    expected_count: Option<usize>,
    field_check: FieldCheck,
}

impl<'a> RecordValidator<'a> {
    pub fn new(shape: &'a RecordShape) -> Self {
        Self {
            shape,
            expected_count: None,
            field_check: FieldCheck::default(),
        }
    }

    pub fn expected_count(mut self, count: Option<usize>) -> Self {
        self.expected_count = count;
        self
    }

    pub fn field_check(mut self, check: FieldCheck) -> Self {
        self.field_check = check;
        self
    }

    /// Run parse → array check → element check → count check, stopping at the first failure.
    ///
    /// An empty array passes unless a count was required.
    pub fn validate(&self, candidate: &str) -> Result<Vec<Record>, ValidationError> {
        let parsed: Value =
            serde_json::from_str(candidate).map_err(|e| ValidationError::parse(&e))?;

        let items = match parsed {
            Value::Array(items) => items,
            other => {
                return Err(ValidationError::NotArray {
                    found: json_type_name(&other),
                })
            }
        };

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let record = match item {
                Value::Object(map) => map,
                other => {
                    return Err(ValidationError::NotObject {
                        index,
                        found: json_type_name(&other),
                    })
                }
            };
            if self.field_check == FieldCheck::Keys {
                self.shape
                    .check_record(&record)
                    .map_err(|reason| ValidationError::Field { index, reason })?;
            }
            records.push(record);
        }

        if let Some(expected) = self.expected_count {
            if records.len() != expected {
                return Err(ValidationError::Count {
                    expected,
                    actual: records.len(),
                });
            }
        }

        Ok(records)
    }
}
