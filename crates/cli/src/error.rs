//! CLI error types.

use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration is invalid or unreadable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred in the bridge layer.
    #[error(transparent)]
    Bridge(#[from] bridge::Error),

    /// The stay catalog could not be loaded.
    #[error(transparent)]
    Sandbox(#[from] sandbox::Error),

    /// A configured global could not be encoded.
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
