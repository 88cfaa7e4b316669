//! Record schemas
//!
//! A record schema is an ordered, fixed list of named fields. It is decided
//! when the topic is created and never changes afterwards.

/// Type of a record field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Integer serialized as a decimal string
    Integer,
    /// Free-form string
    String,
}

impl FieldKind {
    /// Value a field holds before it is first set
    pub fn default_value(&self) -> &'static str {
        match self {
            FieldKind::Integer => "0",
            FieldKind::String => "",
        }
    }
}

/// One named field of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

/// Ordered field layout of a record topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    name: String,
    fields: Vec<FieldSpec>,
}

impl RecordSchema {
    /// Create a schema from explicit field specs
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Schema where every field is an integer
    pub fn integers<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::uniform(name, fields, FieldKind::Integer)
    }

    /// Schema where every field is a string
    pub fn strings<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::uniform(name, fields, FieldKind::String)
    }

    fn uniform<I, S>(name: impl Into<String>, fields: I, kind: FieldKind) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|field| FieldSpec {
                name: field.into(),
                kind,
            })
            .collect();
        Self::new(name, fields)
    }

    /// Record name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record declares no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Name of the field at `index`
    pub fn field_name(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|f| f.name.as_str())
    }

    /// Position of the named field
    pub fn index_of(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_schema() {
        let schema = RecordSchema::integers("RefreshInterval", ["Frequency", "SleepDuration"]);

        assert_eq!(schema.name(), "RefreshInterval");
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.index_of("SleepDuration"), Some(1));
        assert_eq!(schema.index_of("Missing"), None);
        assert!(schema.fields().iter().all(|f| f.kind == FieldKind::Integer));
    }

    #[test]
    fn test_default_values() {
        assert_eq!(FieldKind::Integer.default_value(), "0");
        assert_eq!(FieldKind::String.default_value(), "");
    }
}
