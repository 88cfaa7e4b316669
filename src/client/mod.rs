//! Publisher client
//!
//! Binds broker sessions to the telemetry collaborators and drives the
//! device polling loop.

pub mod config;
pub mod publisher;

pub use config::{PublisherConfig, DEFAULT_NAMESPACE_ROOT};
pub use publisher::Publisher;
