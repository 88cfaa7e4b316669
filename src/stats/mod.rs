//! Publisher metrics and update acknowledgement routing

pub mod ack;
pub mod metrics;

pub use ack::AckRouter;
pub use metrics::{MetricChange, MetricKind, Metrics, DEFAULT_SAMPLE_INTERVAL, METRIC_COUNT};
