//! Coordinator errors.
//!
//! These stay inside the crate's richer API. The ownership and send
//! operations callers normally use collapse them to `bool`.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for coordinator operations.
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// Operation requires holding the port.
    #[error("this process does not own the coordination port")]
    NotOwner,

    /// The accept loop was already started.
    #[error("accept loop is already running")]
    AlreadyRunning,

    /// Another process holds the port.
    #[error("failed to bind {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Payload was empty, too large, multi-line or not UTF-8.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
