//! Provisioning failure reasons

use crate::broker::AddFailure;
use crate::error::ProtocolError;
use crate::topic::TopicPath;

/// Why provisioning stopped before sources were registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionError {
    /// The namespace root query was dropped
    QueryDiscarded(TopicPath),
    /// A topic could not be created
    CreationFailed {
        path: TopicPath,
        reason: AddFailure,
        attempts: u32,
    },
    /// The broker answered out of protocol
    Protocol(ProtocolError),
}

impl std::fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProvisionError::QueryDiscarded(path) => {
                write!(f, "Topic details query discarded for {}", path)
            }
            ProvisionError::CreationFailed {
                path,
                reason,
                attempts,
            } => write!(
                f,
                "Failed to create topic {} after {} attempt(s): {}",
                path, attempts, reason
            ),
            ProvisionError::Protocol(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ProvisionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProvisionError::Protocol(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ProtocolError> for ProvisionError {
    fn from(e: ProtocolError) -> Self {
        ProvisionError::Protocol(e)
    }
}
