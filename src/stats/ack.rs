//! Acknowledgement router
//!
//! One router per broker session receives the outcome of every pushed
//! update and feeds the success and failure counters in [`Metrics`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{trace, warn};

use crate::broker::{UpdateAck, UpdateError};
use crate::topic::TopicPath;

use super::metrics::Metrics;

/// Shared sink for update acknowledgements
pub struct AckRouter {
    metrics: Arc<Metrics>,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl AckRouter {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            metrics,
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Successful updates seen by this router
    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    /// Failed updates seen by this router
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

impl UpdateAck for AckRouter {
    fn on_success(&self, path: &TopicPath) {
        trace!(topic = %path, "Update acknowledged");
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.metrics.record_successful_update();
    }

    fn on_failure(&self, path: &TopicPath, error: &UpdateError) {
        warn!(topic = %path, error = %error, "Update failed");
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.metrics.record_failed_update();
    }
}

impl std::fmt::Debug for AckRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AckRouter")
            .field("succeeded", &self.succeeded())
            .field("failed", &self.failed())
            .finish()
    }
}
