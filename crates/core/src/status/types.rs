//! Types for status channel operations.

use thiserror::Error;

/// Monotonic counter distinguishing successive status-channel connections.
/// Exactly one token is "current" at a time; inbound events tagged with a
/// stale token are discarded without side effects.
pub type SessionToken = u64;

/// Errors that can occur on the status channel.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Transport error: {0}")]
    Transport(String),
}
