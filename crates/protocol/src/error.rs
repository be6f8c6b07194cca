//! Host error types.

use crate::host::HostCallable;
use thiserror::Error;

/// Errors a host reports back to the widget.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum HostError {
    /// The host does not expose the requested callable.
    #[error("host does not expose {0}")]
    NotExposed(HostCallable),

    /// The host rejected the call.
    #[error("host rejected the call: {0}")]
    Rejected(String),

    /// No operation is registered under this name.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The arguments did not match the operation's input shape.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// A value could not be converted to or from JSON.
    #[error("serialization failed: {0}")]
    Serialize(String),
}

impl From<serde_json::Error> for HostError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialize(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HostError>;
