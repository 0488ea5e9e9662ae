//! Coordination store client.
//!
//! Podium keeps its durable state (player registrations, user records) in a
//! distributed key/value store with lease-based expiry and prefix watches.
//! This crate provides the narrow interface the rest of the workspace consumes:
//! plain key/value operations, plus a change-notification stream for a key
//! prefix. The production backend is etcd ([`EtcdStore`]); an in-process
//! backend ([`MemoryStore`]) with identical semantics backs the test suites.

pub mod error;
pub mod etcd;
pub mod event;
pub mod memory;

pub use error::StoreError;
pub use etcd::{EtcdStore, EtcdWatch, StoreConfig};
pub use event::{last_segment, ChangeAction, ChangeEvent, KeyValuePair};
pub use memory::{MemoryStore, MemoryWatch};

use async_trait::async_trait;

/// Convenience result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Plain key/value operations against the coordination store.
///
/// Handlers that map requests directly onto store reads and writes (the CRUD
/// resource layer) only ever see this trait; they never touch the backend
/// client directly.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch a single value. `Ok(None)` means the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Fetch every pair whose key starts with `prefix`.
    async fn get_prefix(&self, prefix: &str) -> Result<Vec<KeyValuePair>>;

    /// Create or overwrite a key.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Delete a key. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// An ordered stream of [`ChangeEvent`]s for a watched key prefix.
///
/// `Ok(None)` means the stream ended cleanly (the backend closed it); an
/// `Err` is a transport-level failure. Either way the subscription is dead
/// and the caller decides whether to resubscribe.
#[async_trait]
pub trait EventSource: Send {
    async fn next_event(&mut self) -> Result<Option<ChangeEvent>>;
}

/// A [`KeyValueStore`] that can also emit change events for a prefix.
#[async_trait]
pub trait WatchableStore: KeyValueStore {
    type Watch: EventSource + 'static;

    /// Subscribe to all future changes under `prefix`.
    async fn watch_prefix(&self, prefix: &str) -> Result<Self::Watch>;
}
