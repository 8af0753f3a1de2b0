//! Protocol errors.

use thiserror::Error;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding wire frames.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Frame was not a valid message object
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Frame exceeded the configured size limit
    #[error("message too large: {size} bytes (max {max})")]
    TooLarge {
        /// Size of the rejected frame
        size: usize,
        /// Configured limit
        max: usize,
    },
}
