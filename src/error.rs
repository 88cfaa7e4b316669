//! Error types
//!
//! Each concern has its own small error enum; [`Error`] wraps them so that
//! public entry points can return a single [`Result`].

use crate::topic::TopicPath;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Provisioning protocol misuse
    Protocol(ProtocolError),
    /// Record content could not be built
    Content(ContentError),
    /// Input device does not fit the button mapping
    Device(DeviceError),
    /// Malformed topic path
    InvalidTopicPath(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Protocol(e) => write!(f, "Protocol error: {}", e),
            Error::Content(e) => write!(f, "Content error: {}", e),
            Error::Device(e) => write!(f, "Device error: {}", e),
            Error::InvalidTopicPath(path) => write!(f, "Invalid topic path: {:?}", path),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Protocol(e) => Some(e),
            Error::Content(e) => Some(e),
            Error::Device(e) => Some(e),
            Error::InvalidTopicPath(_) => None,
        }
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

impl From<ContentError> for Error {
    fn from(e: ContentError) -> Self {
        Error::Content(e)
    }
}

impl From<DeviceError> for Error {
    fn from(e: DeviceError) -> Self {
        Error::Device(e)
    }
}

/// Errors raised when the provisioning protocol is driven out of order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// `start` was called on a provisioner that already started
    AlreadyStarted(TopicPath),
    /// The broker answered a details query for a path we never asked about
    UnexpectedTopic {
        expected: TopicPath,
        actual: TopicPath,
    },
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::AlreadyStarted(root) => {
                write!(f, "Provisioning already started for {}", root)
            }
            ProtocolError::UnexpectedTopic { expected, actual } => write!(
                f,
                "Topic details received for unexpected path {} (expected {})",
                actual, expected
            ),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Errors raised while building record content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    /// Field name is not part of the record schema
    UnknownField { record: String, field: String },
}

impl std::fmt::Display for ContentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentError::UnknownField { record, field } => {
                write!(f, "Record {} has no field named {:?}", record, field)
            }
        }
    }
}

impl std::error::Error for ContentError {}

/// Errors raised by the input-device adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Device reports more buttons than the mapping table covers
    UnmappedButtonCount {
        profile: &'static str,
        mapped: usize,
        reported: usize,
    },
    /// Raw button array changed size between two polls
    ButtonArrayLengthChanged { previous: usize, current: usize },
}

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceError::UnmappedButtonCount {
                profile,
                mapped,
                reported,
            } => write!(
                f,
                "Device reports {} buttons but the {} mapping covers only {}",
                reported, profile, mapped
            ),
            DeviceError::ButtonArrayLengthChanged { previous, current } => write!(
                f,
                "Button array length changed from {} to {}",
                previous, current
            ),
        }
    }
}

impl std::error::Error for DeviceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = Error::from(DeviceError::UnmappedButtonCount {
            profile: "joystick",
            mapped: 5,
            reported: 11,
        });
        let text = err.to_string();
        assert!(text.contains("11"));
        assert!(text.contains("joystick"));
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error as _;

        let err = Error::from(ContentError::UnknownField {
            record: "ButtonsState".into(),
            field: "Turbo".into(),
        });
        assert!(err.source().is_some());
        assert!(Error::InvalidTopicPath(String::new()).source().is_none());
    }
}
