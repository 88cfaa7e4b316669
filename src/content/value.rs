//! Content values
//!
//! [`Content`] is the payload handed to the broker for one update. Once
//! pushed, the broker owns it; sources keep no reference.

use std::sync::Arc;

use bytes::Bytes;

use super::encoder;
use super::schema::RecordSchema;

/// Payload of a topic update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// String-serialized scalar
    Scalar(String),
    /// Record with one string-serialized value per schema field
    Record(RecordContent),
}

impl Content {
    /// Create scalar content from an already formatted string
    pub fn scalar(value: impl Into<String>) -> Self {
        Content::Scalar(value.into())
    }

    /// Try to get this content as a scalar string
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Content::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this content as a record
    pub fn as_record(&self) -> Option<&RecordContent> {
        match self {
            Content::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Encode to the broker wire format
    pub fn to_bytes(&self) -> Bytes {
        encoder::encode(self)
    }
}

impl From<f64> for Content {
    fn from(value: f64) -> Self {
        Content::Scalar(encoder::format_f64(value))
    }
}

impl From<u64> for Content {
    fn from(value: u64) -> Self {
        Content::Scalar(value.to_string())
    }
}

impl From<i64> for Content {
    fn from(value: i64) -> Self {
        Content::Scalar(value.to_string())
    }
}

/// Snapshot of a record's field values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordContent {
    schema: Arc<RecordSchema>,
    values: Vec<String>,
}

impl RecordContent {
    pub(super) fn new(schema: Arc<RecordSchema>, values: Vec<String>) -> Self {
        debug_assert_eq!(schema.len(), values.len());
        Self { schema, values }
    }

    /// Schema this record was built against
    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// Value of the named field
    pub fn get(&self, field: &str) -> Option<&str> {
        let index = self.schema.index_of(field)?;
        self.value(index)
    }

    /// Value at a field position
    pub fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    /// Values in schema order
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// `(name, value)` pairs in schema order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.schema
            .fields()
            .iter()
            .zip(self.values.iter())
            .map(|(spec, value)| (spec.name.as_str(), value.as_str()))
    }
}
