//! Presence error types.

use coordination_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PresenceError {
    /// The coordination store failed underneath us.
    #[error("Coordination store error: {0}")]
    Store(#[from] StoreError),

    /// The singleton accessor was used before the service was initialized.
    #[error("Presence service has not been initialized")]
    NotInitialized,
}
