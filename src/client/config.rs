//! Publisher configuration

use std::time::Duration;

use crate::error::Result;
use crate::provision::CreationFailurePolicy;
use crate::topic::TopicPath;

/// Namespace root used when none is configured
pub const DEFAULT_NAMESPACE_ROOT: &str = "F1Publisher";

/// Publisher configuration options
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Root of the provisioned topic tree
    pub namespace_root: String,

    /// Reaction to a topic the broker refuses to create
    pub creation_failure_policy: CreationFailurePolicy,

    /// Capacity of the provisioning event channel
    pub event_capacity: usize,

    /// Window over which metric rates are computed
    pub metrics_interval: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            namespace_root: DEFAULT_NAMESPACE_ROOT.to_string(),
            creation_failure_policy: CreationFailurePolicy::Abort,
            event_capacity: 256,
            metrics_interval: Duration::from_secs(1),
        }
    }
}

impl PublisherConfig {
    /// Create a config rooted at `root`
    pub fn with_root(root: impl Into<String>) -> Self {
        Self {
            namespace_root: root.into(),
            ..Default::default()
        }
    }

    /// Set the namespace root
    pub fn namespace_root(mut self, root: impl Into<String>) -> Self {
        self.namespace_root = root.into();
        self
    }

    /// Set the creation failure policy
    pub fn creation_failure_policy(mut self, policy: CreationFailurePolicy) -> Self {
        self.creation_failure_policy = policy;
        self
    }

    /// Retry failed topic creations up to `max_attempts` times
    pub fn retry_creation(self, max_attempts: u32) -> Self {
        self.creation_failure_policy(CreationFailurePolicy::Retry { max_attempts })
    }

    /// Set the event channel capacity
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Set the metric rate window
    pub fn metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = interval;
        self
    }

    /// Validated namespace root
    pub fn root_path(&self) -> Result<TopicPath> {
        TopicPath::new(self.namespace_root.as_str())
    }
}
