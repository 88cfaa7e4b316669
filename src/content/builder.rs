//! Record content builder
//!
//! A builder is owned by one source and reused for every update it pushes.
//! Fields keep whatever value they were last set to, so a source must set
//! every field it is responsible for or stale values are republished.

use std::sync::Arc;

use crate::error::ContentError;

use super::schema::RecordSchema;
use super::value::{Content, RecordContent};

/// Reusable builder for one record schema
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    schema: Arc<RecordSchema>,
    values: Vec<String>,
}

impl RecordBuilder {
    /// Create a builder with every field at its default value
    pub fn new(schema: Arc<RecordSchema>) -> Self {
        let values = schema
            .fields()
            .iter()
            .map(|f| f.kind.default_value().to_string())
            .collect();
        Self { schema, values }
    }

    /// Schema being built
    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    /// Set a field by name
    pub fn set(&mut self, field: &str, value: impl Into<String>) -> Result<&mut Self, ContentError> {
        let index = self
            .schema
            .index_of(field)
            .ok_or_else(|| self.unknown_field(field))?;
        self.values[index] = value.into();
        Ok(self)
    }

    /// Set a field by position
    pub fn set_index(
        &mut self,
        index: usize,
        value: impl Into<String>,
    ) -> Result<&mut Self, ContentError> {
        if index >= self.values.len() {
            return Err(self.unknown_field(&format!("#{}", index)));
        }
        self.values[index] = value.into();
        Ok(self)
    }

    /// Current value of a field
    pub fn get(&self, field: &str) -> Option<&str> {
        let index = self.schema.index_of(field)?;
        Some(self.values[index].as_str())
    }

    /// Snapshot the current values as content
    pub fn build(&self) -> Content {
        Content::Record(RecordContent::new(
            Arc::clone(&self.schema),
            self.values.clone(),
        ))
    }

    fn unknown_field(&self, field: &str) -> ContentError {
        ContentError::UnknownField {
            record: self.schema.name().to_string(),
            field: field.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Arc<RecordSchema> {
        Arc::new(RecordSchema::integers("Pair", ["Left", "Right"]))
    }

    #[test]
    fn test_defaults() {
        let builder = RecordBuilder::new(schema());
        let content = builder.build();
        let record = content.as_record().unwrap();

        assert_eq!(record.values(), &["0".to_string(), "0".to_string()]);
    }

    #[test]
    fn test_values_persist_between_builds() {
        let mut builder = RecordBuilder::new(schema());

        builder.set("Left", "1").unwrap();
        let first = builder.build();

        builder.set("Right", "5").unwrap();
        let second = builder.build();

        assert_eq!(first.as_record().unwrap().get("Right"), Some("0"));
        // Left was never reset, so it carries over into the second build
        assert_eq!(second.as_record().unwrap().get("Left"), Some("1"));
        assert_eq!(second.as_record().unwrap().get("Right"), Some("5"));
    }

    #[test]
    fn test_unknown_field() {
        let mut builder = RecordBuilder::new(schema());

        let err = builder.set("Middle", "1").unwrap_err();
        assert_eq!(
            err,
            ContentError::UnknownField {
                record: "Pair".into(),
                field: "Middle".into()
            }
        );
        assert!(builder.set_index(2, "1").is_err());
        assert!(builder.set_index(1, "9").is_ok());
        assert_eq!(builder.get("Right"), Some("9"));
    }
}
