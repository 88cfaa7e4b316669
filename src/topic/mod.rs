//! Topic naming
//!
//! Topic paths and the fixed namespace layout the publisher provisions.

pub mod layout;
pub mod path;

pub use layout::{
    button_names_schema, button_states_schema, refresh_interval_schema, TopicEntry, TopicId,
    TopicKind, TopicLayout, FREQUENCY_FIELD, SLEEP_DURATION_FIELD,
};
pub use path::TopicPath;
