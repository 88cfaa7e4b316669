//! Broker-facing interfaces
//!
//! The publisher never talks to a broker connection directly. It consumes
//! the operations below and implements the callback traits the broker
//! invokes later, usually from its own threads:
//!
//! ```text
//! TopicControl::query_topic_details ──► TopicDetailsCallback
//! TopicControl::add_topic           ──► AddTopicCallback
//! TopicControl::register_update_source
//!                                   ──► UpdateSource::{on_active, on_standby, on_closed}
//! UpdateChannel::push               ──► UpdateAck::{on_success, on_failure}
//! ```
//!
//! Every callback is synchronous and must not block. The publisher holds no
//! lock while calling a [`TopicControl`] operation. Update sources are the
//! exception: they push under their own lock to keep updates in order, so
//! an [`UpdateChannel`] must never call back into the pushing source from
//! inside `push`.

use std::sync::Arc;

use crate::content::Content;
use crate::topic::{TopicKind, TopicPath};

/// Broker metadata for an existing topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDetails {
    pub path: TopicPath,
    /// `None` for structural nodes that carry no data
    pub kind: Option<TopicKind>,
}

/// Answer to a topic details query
pub trait TopicDetailsCallback: Send + Sync {
    /// The topic exists
    fn on_topic_details(&self, path: &TopicPath, details: &TopicDetails);

    /// No topic exists at the path
    fn on_topic_unknown(&self, path: &TopicPath);

    /// The query was dropped before an answer arrived
    fn on_discard(&self, path: &TopicPath);
}

/// Why a topic could not be added
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddFailure {
    /// A topic already exists at the path
    Exists,
    /// The broker refused the request
    Rejected(String),
    /// The request was dropped before an answer arrived
    Discarded,
}

impl std::fmt::Display for AddFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddFailure::Exists => write!(f, "topic already exists"),
            AddFailure::Rejected(reason) => write!(f, "rejected: {}", reason),
            AddFailure::Discarded => write!(f, "request discarded"),
        }
    }
}

/// Answer to an add-topic request
pub trait AddTopicCallback: Send + Sync {
    fn on_topic_added(&self, path: &TopicPath);

    fn on_topic_add_failed(&self, path: &TopicPath, reason: &AddFailure);
}

/// Topic management operations offered by a broker session
pub trait TopicControl: Send + Sync {
    /// Ask whether a topic exists; exactly one callback method is invoked
    fn query_topic_details(&self, path: &TopicPath, callback: Arc<dyn TopicDetailsCallback>);

    /// Create one topic
    fn add_topic(&self, path: &TopicPath, kind: &TopicKind, callback: Arc<dyn AddTopicCallback>);

    /// Attach an update source to a path
    ///
    /// The broker decides when the source becomes active.
    fn register_update_source(&self, path: &TopicPath, source: Arc<dyn UpdateSource>);
}

/// A source of updates for one topic path
pub trait UpdateSource: Send + Sync {
    /// Authority to update `path` was granted
    fn on_active(&self, path: &TopicPath, channel: Arc<dyn UpdateChannel>);

    /// Authority was revoked for now; it may be granted again
    fn on_standby(&self, path: &TopicPath);

    /// The registration ended for good
    fn on_closed(&self, path: &TopicPath);
}

/// Channel used by an active source to publish content
pub trait UpdateChannel: Send + Sync {
    /// Submit content for `path`
    ///
    /// `Err` means the update was refused synchronously and `ack` will not
    /// be called. Otherwise the broker owns the content and reports the
    /// outcome through `ack`.
    ///
    /// Called with the source's lock held. Revoking authority in reaction
    /// to a push must happen on another thread; the source observes it once
    /// `push` returns.
    fn push(
        &self,
        path: &TopicPath,
        content: Content,
        ack: Arc<dyn UpdateAck>,
    ) -> Result<(), UpdateError>;
}

/// Outcome sink for pushed updates
pub trait UpdateAck: Send + Sync {
    fn on_success(&self, path: &TopicPath);

    fn on_failure(&self, path: &TopicPath, error: &UpdateError);
}

/// Reasons an update push failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    /// The source no longer holds update authority
    NotActive,
    /// The broker refused the content
    Rejected(String),
    /// The session is gone
    Disconnected,
}

impl std::fmt::Display for UpdateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateError::NotActive => write!(f, "Update source is not active"),
            UpdateError::Rejected(reason) => write!(f, "Update rejected: {}", reason),
            UpdateError::Disconnected => write!(f, "Broker session disconnected"),
        }
    }
}

impl std::error::Error for UpdateError {}
