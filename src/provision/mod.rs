//! Namespace provisioning
//!
//! A [`TopicProvisioner`] lives for one broker session. It makes sure the
//! topic tree exists, then hands every topic to an update source.

pub mod error;
pub mod pending;
pub mod provisioner;

pub use error::ProvisionError;
pub use pending::PendingCreationSet;
pub use provisioner::{CreationFailurePolicy, ProvisionEvent, ProvisionPhase, TopicProvisioner};
