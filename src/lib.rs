//! Steering-wheel telemetry publisher
//!
//! Publishes live controller state into a hierarchical pub/sub topic tree.
//! On every broker session the publisher:
//!
//! 1. Queries the namespace root and, if it is unknown, creates every topic
//!    of the fixed layout
//! 2. Waits until every creation is acknowledged, in whatever order the
//!    broker answers
//! 3. Registers one update source per topic; each source pushes content
//!    only while the broker grants it update authority
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use f1_publisher::testing::MockBroker;
//! use f1_publisher::{Publisher, PublisherConfig, TopicPath};
//!
//! let publisher = Publisher::new(PublisherConfig::default());
//! let broker = MockBroker::auto();
//!
//! publisher.on_connected(Arc::new(broker.clone())).unwrap();
//! broker.activate_all();
//!
//! let gear = TopicPath::new("F1Publisher/Gear").unwrap();
//! assert_eq!(broker.latest(&gear).unwrap().as_scalar(), Some("1"));
//! ```

pub mod broker;
pub mod client;
pub mod content;
pub mod error;
pub mod feed;
pub mod provision;
pub mod source;
pub mod stats;
pub mod testing;
pub mod topic;

pub use client::{Publisher, PublisherConfig};
pub use error::{Error, Result};
pub use provision::{ProvisionEvent, TopicProvisioner};
pub use topic::{TopicLayout, TopicPath};
