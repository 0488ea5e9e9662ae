//! Shared state for request handlers.

use coordination_store::KeyValueStore;
use presence::PresenceRegistry;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

/// Handles every request task needs: the presence registry read surface,
/// the coordination store for CRUD resources, and the relay connection
/// counter surfaced by `/stats`.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<PresenceRegistry>,
    pub store: Arc<dyn KeyValueStore>,
    pub relay_connections: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(registry: Arc<PresenceRegistry>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            registry,
            store,
            relay_connections: Arc::new(AtomicUsize::new(0)),
        }
    }
}
