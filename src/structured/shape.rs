//! Typed record descriptors.
//!
//! A [`RecordShape`] stays typed inside the crate; it becomes the untyped example object the
//! model sees only when [`RecordShape::schema_example`] is called during prompt construction.

use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::{Error, ErrorContext, Result};

/// Expected type of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// A string value.
    Text,
    /// An array of strings.
    TextList,
    /// A nested object with its own shape.
    Nested(RecordShape),
}

impl FieldKind {
    fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "string",
            FieldKind::TextList => "array of strings",
            FieldKind::Nested(_) => "object",
        }
    }
}

/// One named field, optionally carrying a hint rendered as its example value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub hint: Option<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    fn example(&self) -> Value {
        let hint = self.hint.clone().unwrap_or_default();
        match &self.kind {
            FieldKind::Text => Value::String(hint),
            FieldKind::TextList => Value::Array(vec![Value::String(hint)]),
            FieldKind::Nested(shape) => shape.to_example(),
        }
    }
}

/// Ordered set of fields describing one output record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordShape {
    fields: Vec<FieldSpec>,
}

impl RecordShape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn text(self, name: impl Into<String>) -> Self {
        self.field(FieldSpec::new(name, FieldKind::Text))
    }

    pub fn text_with_hint(self, name: impl Into<String>, hint: impl Into<String>) -> Self {
        self.field(FieldSpec::new(name, FieldKind::Text).with_hint(hint))
    }

    pub fn text_list(self, name: impl Into<String>) -> Self {
        self.field(FieldSpec::new(name, FieldKind::TextList))
    }

    pub fn nested(self, name: impl Into<String>, shape: RecordShape) -> Self {
        self.field(FieldSpec::new(name, FieldKind::Nested(shape)))
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Reject empty shapes (at any depth), blank names and duplicate names.
    pub fn validate(&self) -> Result<()> {
        self.validate_at("shape")
    }

    fn validate_at(&self, path: &str) -> Result<()> {
        if self.fields.is_empty() {
            return Err(Error::validation_with_context(
                "Record shape must declare at least one field",
                ErrorContext::new()
                    .with_field_path(path)
                    .with_source("record_shape"),
            ));
        }
        let mut seen = HashSet::new();
        for f in &self.fields {
            let field_path = format!("{}.{}", path, f.name);
            if f.name.trim().is_empty() {
                return Err(Error::validation_with_context(
                    "Field name must not be blank",
                    ErrorContext::new()
                        .with_field_path(path)
                        .with_source("record_shape"),
                ));
            }
            if !seen.insert(f.name.as_str()) {
                return Err(Error::validation_with_context(
                    "Duplicate field name",
                    ErrorContext::new()
                        .with_field_path(field_path)
                        .with_source("record_shape"),
                ));
            }
            if let FieldKind::Nested(inner) = &f.kind {
                inner.validate_at(&field_path)?;
            }
        }
        Ok(())
    }

    /// Example object for one record, fields in declaration order.
    pub fn to_example(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.example()))
            .collect();
        Value::Object(map)
    }

    /// The example wrapped in a one-element array: "an array of objects like this".
    pub fn schema_example(&self) -> Value {
        Value::Array(vec![self.to_example()])
    }

    /// Derive a shape from an untyped example object such as `{"question": "", "tags": [""]}`.
    ///
    /// Non-empty example strings become hints.
    pub fn from_example(example: &Value) -> Result<Self> {
        Self::from_example_at(example, "shape")
    }

    fn from_example_at(example: &Value, path: &str) -> Result<Self> {
        let obj = example.as_object().ok_or_else(|| {
            Error::validation_with_context(
                "Record shape example must be a JSON object",
                ErrorContext::new()
                    .with_field_path(path)
                    .with_source("record_shape"),
            )
        })?;

        let mut shape = RecordShape::new();
        for (name, value) in obj {
            let field_path = format!("{}.{}", path, name);
            let spec = match value {
                Value::String(s) if s.is_empty() => FieldSpec::new(name.clone(), FieldKind::Text),
                Value::String(s) => FieldSpec::new(name.clone(), FieldKind::Text).with_hint(s),
                Value::Array(items) if items.iter().all(Value::is_string) => {
                    FieldSpec::new(name.clone(), FieldKind::TextList)
                }
                Value::Object(_) => FieldSpec::new(
                    name.clone(),
                    FieldKind::Nested(Self::from_example_at(value, &field_path)?),
                ),
                _ => {
                    return Err(Error::validation_with_context(
                        "Example values must be strings, string arrays or objects",
                        ErrorContext::new()
                            .with_field_path(field_path)
                            .with_source("record_shape"),
                    ))
                }
            };
            shape = shape.field(spec);
        }
        shape.validate()?;
        Ok(shape)
    }

    /// Check that `record` carries every field with a value of the declared kind.
    ///
    /// Extra fields are tolerated.
    pub fn check_record(&self, record: &Map<String, Value>) -> std::result::Result<(), String> {
        self.check_at(record, "")
    }

    fn check_at(&self, record: &Map<String, Value>, prefix: &str) -> std::result::Result<(), String> {
        for f in &self.fields {
            let path = format!("{}{}", prefix, f.name);
            let value = record
                .get(&f.name)
                .ok_or_else(|| format!("missing field `{}`", path))?;
            let ok = match (&f.kind, value) {
                (FieldKind::Text, Value::String(_)) => true,
                (FieldKind::TextList, Value::Array(items)) => items.iter().all(Value::is_string),
                (FieldKind::Nested(inner), Value::Object(obj)) => {
                    inner.check_at(obj, &format!("{}.", path))?;
                    true
                }
                _ => false,
            };
            if !ok {
                return Err(format!("field `{}` is not a {}", path, f.kind.name()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn open_ended() -> RecordShape {
        RecordShape::new().text("question").text("answer")
    }

    #[test]
    fn test_schema_example_is_one_element_array_in_order() {
        let shape = RecordShape::new()
            .text("question")
            .text_with_hint("answer", "at most 15 words")
            .text_list("tags");
        let example = shape.schema_example();
        assert_eq!(
            serde_json::to_string(&example).unwrap(),
            r#"[{"question":"","answer":"at most 15 words","tags":[""]}]"#
        );
    }

    #[test]
    fn test_nested_example() {
        let shape = RecordShape::new()
            .text("q")
            .nested("meta", RecordShape::new().text("source"));
        assert_eq!(shape.to_example(), json!({"q": "", "meta": {"source": ""}}));
    }

    #[test]
    fn test_validate_rejects_empty_and_duplicates() {
        assert!(RecordShape::new().validate().is_err());
        assert!(RecordShape::new().text("a").text("a").validate().is_err());
        let nested_empty = RecordShape::new().nested("inner", RecordShape::new());
        let err = nested_empty.validate().unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("shape.inner")
        );
        assert!(open_ended().validate().is_ok());
    }

    #[test]
    fn test_from_example_roundtrips_kinds() {
        let shape = RecordShape::from_example(&json!({
            "question": "",
            "answer": "short answer",
            "options": [""],
            "meta": {"level": ""}
        }))
        .unwrap();
        let kinds: Vec<_> = shape.fields().iter().map(|f| f.kind.name()).collect();
        assert_eq!(kinds, vec!["string", "string", "array of strings", "object"]);
        assert_eq!(shape.fields()[1].hint.as_deref(), Some("short answer"));
    }

    #[test]
    fn test_from_example_rejects_numbers() {
        assert!(RecordShape::from_example(&json!({"n": 1})).is_err());
        assert!(RecordShape::from_example(&json!(["x"])).is_err());
        assert!(RecordShape::from_example(&json!({})).is_err());
    }

    #[test]
    fn test_check_record() {
        let shape = open_ended();
        let good = json!({"question": "Q", "answer": "A", "extra": 1});
        assert!(shape.check_record(good.as_object().unwrap()).is_ok());

        let missing = json!({"question": "Q"});
        assert_eq!(
            shape.check_record(missing.as_object().unwrap()).unwrap_err(),
            "missing field `answer`"
        );

        let wrong = json!({"question": "Q", "answer": 42});
        assert_eq!(
            shape.check_record(wrong.as_object().unwrap()).unwrap_err(),
            "field `answer` is not a string"
        );
    }
}
