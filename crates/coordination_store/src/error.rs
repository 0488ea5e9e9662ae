//! Error types for coordination store operations.

use thiserror::Error;

/// Errors surfaced by store clients and watch streams.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The client could not be constructed (bad endpoints, unreachable store).
    #[error("Failed to connect to coordination store: {0}")]
    Connect(String),

    /// A request or watch stream failed at the transport level.
    #[error("Store transport error: {0}")]
    Transport(#[from] etcd_client::Error),

    /// The watch stream ended or was cancelled by the server.
    #[error("Watch stream closed")]
    Closed,

    /// A key did not have the expected shape (empty, bad UTF-8, no id segment).
    #[error("Invalid store key: {0}")]
    InvalidKey(String),
}
