//! Fixed topic namespace
//!
//! Every publisher session provisions the same thirteen topics below a
//! configurable root:
//!
//! ```text
//! {root}
//! ├── Steering                 scalar
//! ├── Braking                  scalar
//! ├── Acceleration             scalar
//! ├── Gear                     scalar
//! ├── RefreshInterval          record (Frequency, SleepDuration)
//! ├── Buttons
//! │   ├── States               record (one field per button)
//! │   └── Names                record (static)
//! └── Metrics
//!     └── {MetricKind}         scalar x6
//! ```

use std::sync::{Arc, OnceLock};

use crate::content::RecordSchema;
use crate::error::Result;
use crate::feed::CarButton;
use crate::stats::MetricKind;

use super::path::TopicPath;

/// Field holding the refresh frequency in Hz
pub const FREQUENCY_FIELD: &str = "Frequency";
/// Field holding the sleep duration in milliseconds
pub const SLEEP_DURATION_FIELD: &str = "SleepDuration";

/// Content kind of a topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicKind {
    /// Single primitive value
    Scalar,
    /// Fixed set of named fields
    Record(Arc<RecordSchema>),
}

impl TopicKind {
    /// Whether this is a record topic
    pub fn is_record(&self) -> bool {
        matches!(self, TopicKind::Record(_))
    }
}

/// Identifies one topic of the namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicId {
    Steering,
    Braking,
    Acceleration,
    Gear,
    RefreshInterval,
    ButtonStates,
    ButtonNames,
    Metric(MetricKind),
}

impl TopicId {
    /// All topics in provisioning order
    pub const ALL: [TopicId; 13] = [
        TopicId::Steering,
        TopicId::Braking,
        TopicId::Acceleration,
        TopicId::Gear,
        TopicId::RefreshInterval,
        TopicId::ButtonStates,
        TopicId::ButtonNames,
        TopicId::Metric(MetricKind::CountOfUpdates),
        TopicId::Metric(MetricKind::UpTimeInSeconds),
        TopicId::Metric(MetricKind::CountOfSuccessfulTopicSourceUpdates),
        TopicId::Metric(MetricKind::CountOfFailedTopicSourceUpdates),
        TopicId::Metric(MetricKind::RateOfUpdatesPerSecond),
        TopicId::Metric(MetricKind::RateOfSuccessfulTopicSourceUpdatesPerSecond),
    ];

    /// Path relative to the namespace root
    pub fn relative_path(&self) -> &'static str {
        match self {
            TopicId::Steering => "Steering",
            TopicId::Braking => "Braking",
            TopicId::Acceleration => "Acceleration",
            TopicId::Gear => "Gear",
            TopicId::RefreshInterval => "RefreshInterval",
            TopicId::ButtonStates => "Buttons/States",
            TopicId::ButtonNames => "Buttons/Names",
            TopicId::Metric(kind) => kind.topic_path(),
        }
    }

    /// Content kind the topic is created with
    pub fn kind(&self) -> TopicKind {
        match self {
            TopicId::RefreshInterval => TopicKind::Record(refresh_interval_schema()),
            TopicId::ButtonStates => TopicKind::Record(button_states_schema()),
            TopicId::ButtonNames => TopicKind::Record(button_names_schema()),
            _ => TopicKind::Scalar,
        }
    }
}

/// One provisioned topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicEntry {
    pub id: TopicId,
    pub path: TopicPath,
    pub kind: TopicKind,
}

/// The full namespace resolved against a root
#[derive(Debug, Clone)]
pub struct TopicLayout {
    root: TopicPath,
    entries: Vec<TopicEntry>,
}

impl TopicLayout {
    /// Resolve every topic below `root`
    pub fn new(root: TopicPath) -> Result<Self> {
        let entries = TopicId::ALL
            .iter()
            .map(|id| {
                Ok(TopicEntry {
                    id: *id,
                    path: root.join(id.relative_path())?,
                    kind: id.kind(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { root, entries })
    }

    /// Namespace root
    pub fn root(&self) -> &TopicPath {
        &self.root
    }

    /// All entries in provisioning order
    pub fn entries(&self) -> &[TopicEntry] {
        &self.entries
    }

    /// Number of topics
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a resolved layout
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by id
    pub fn get(&self, id: TopicId) -> Option<&TopicEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Look up an entry by path
    pub fn find(&self, path: &TopicPath) -> Option<&TopicEntry> {
        self.entries.iter().find(|e| &e.path == path)
    }
}

/// Schema of the `RefreshInterval` record
pub fn refresh_interval_schema() -> Arc<RecordSchema> {
    static SCHEMA: OnceLock<Arc<RecordSchema>> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            Arc::new(RecordSchema::integers(
                "RefreshInterval",
                [FREQUENCY_FIELD, SLEEP_DURATION_FIELD],
            ))
        })
        .clone()
}

/// Schema of the `Buttons/States` record, one integer field per button
pub fn button_states_schema() -> Arc<RecordSchema> {
    static SCHEMA: OnceLock<Arc<RecordSchema>> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            Arc::new(RecordSchema::integers(
                "ButtonsState",
                CarButton::ALL.iter().map(|b| b.name()),
            ))
        })
        .clone()
}

/// Schema of the `Buttons/Names` record, one string field per button ordinal
pub fn button_names_schema() -> Arc<RecordSchema> {
    static SCHEMA: OnceLock<Arc<RecordSchema>> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            Arc::new(RecordSchema::strings(
                "ButtonNames",
                CarButton::ALL.iter().map(|b| b.index().to_string()),
            ))
        })
        .clone()
}
