//! Bridge error types.

use protocol::HostError;
use thiserror::Error;

/// Errors surfaced by the bridge.
///
/// Stale selection ids and malformed draft input are resolved locally and
/// never show up here.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No host, or the host does not expose the callable this action needs.
    #[error("host unavailable")]
    HostUnavailable,

    /// The host rejected a remote invocation.
    #[error("invocation rejected: {0}")]
    InvocationRejected(#[from] HostError),

    /// The persisted state would exceed what the host accepts.
    #[error("widget state too large: {size} bytes (max {max})")]
    StateTooLarge { size: usize, max: usize },

    #[error("failed to serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
