//! Content encoding
//!
//! Converts scalar and record values into the payloads handed to the broker.
//! Record content is produced by a [`RecordBuilder`] that each record source
//! keeps for its whole lifetime.

pub mod builder;
pub mod encoder;
pub mod schema;
pub mod value;

pub use builder::RecordBuilder;
pub use encoder::{format_f64, ContentEncoder, FIELD_DELIMITER};
pub use schema::{FieldKind, FieldSpec, RecordSchema};
pub use value::{Content, RecordContent};
