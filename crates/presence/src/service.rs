//! Presence service lifecycle.
//!
//! One `PresenceService` exists per process: it owns the store handle and
//! the registry, seeds the registry from the store's current contents, and
//! supervises the reconciliation loop for the lifetime of the process.
//! Request handlers only ever touch the registry read surface.

use crate::error::PresenceError;
use crate::player::PlayerInfo;
use crate::reconciler::Reconciler;
use crate::registry::PresenceRegistry;
use crate::PLAYERS_PREFIX;
use coordination_store::{last_segment, EtcdStore, KeyValueStore, StoreConfig, WatchableStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, OnceCell};
use tracing::{error, info, warn};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Registry plus store handle, generic over the store backend so the whole
/// pipeline runs against the in-process store in tests.
pub struct PresenceService<S> {
    registry: Arc<PresenceRegistry>,
    store: S,
}

impl<S> PresenceService<S>
where
    S: WatchableStore + Clone + Send + Sync + 'static,
{
    /// Wrap an already-connected store with an empty registry.
    pub fn new(store: S) -> Self {
        Self {
            registry: Arc::new(PresenceRegistry::new()),
            store,
        }
    }

    /// The shared registry handle handlers read from.
    pub fn registry(&self) -> Arc<PresenceRegistry> {
        self.registry.clone()
    }

    /// A clone of the underlying store handle.
    pub fn store(&self) -> S {
        self.store.clone()
    }

    /// Load the players currently registered in the store.
    ///
    /// Without this a freshly started process would not know about players
    /// that registered before it began watching; they are seeded online,
    /// and the watch stream corrects the view from there. Malformed records
    /// are skipped the same way the reconciler skips malformed events.
    pub async fn seed(&self) -> Result<(), PresenceError> {
        let pairs = self.store.get_prefix(PLAYERS_PREFIX).await?;
        let mut seeded = 0usize;

        for pair in pairs {
            let Some(id) = last_segment(&pair.key) else {
                warn!(key = %pair.key, "Skipping player record with no id segment");
                continue;
            };
            match PlayerInfo::decode(&pair.value) {
                Ok(info) => {
                    self.registry.upsert(id, info, true);
                    seeded += 1;
                }
                Err(err) => {
                    warn!(player = %id, error = %err, "Skipping malformed player record");
                }
            }
        }

        info!("Seeded presence registry with {} player(s)", seeded);
        Ok(())
    }

    /// Supervise the reconciliation loop until shutdown fires.
    ///
    /// Each round subscribes to the players namespace first and seeds from a
    /// store scan second, so a registration landing between the two is seen
    /// either way. The reconciler itself stops on any stream-level failure;
    /// this loop owns the restart policy: log the failure, wait with
    /// exponential backoff, resubscribe. A clean stop (shutdown) ends
    /// supervision.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        let mut backoff = INITIAL_BACKOFF;

        loop {
            match self.subscribe_and_seed().await {
                Ok(watch) => {
                    backoff = INITIAL_BACKOFF;
                    let reconciler = Reconciler::new(self.registry.clone(), watch);
                    match reconciler.run(&mut shutdown).await {
                        Ok(()) => return,
                        Err(err) => {
                            error!(error = %err, "Presence watch stream failed");
                        }
                    }
                }
                Err(err) => {
                    error!(error = %err, "Failed to subscribe to player changes");
                }
            }

            warn!("Resubscribing to player changes in {:?}", backoff);
            tokio::select! {
                _ = shutdown.recv() => return,
                _ = tokio::time::sleep(backoff) => {}
            }
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }

    async fn subscribe_and_seed(&self) -> Result<S::Watch, PresenceError> {
        let watch = self.store.watch_prefix(PLAYERS_PREFIX).await?;
        self.seed().await?;
        Ok(watch)
    }
}

static SERVICE: OnceCell<Arc<PresenceService<EtcdStore>>> = OnceCell::const_new();

/// Initialize the process-wide presence service.
///
/// Safe to call from concurrent first accessors: construction happens
/// exactly once and every caller gets the same instance. Connecting to the
/// store is part of construction - a failure here leaves the singleton
/// unset and is fatal to a process that needs presence. The registry fills
/// once [`PresenceService::run`] subscribes and seeds.
pub async fn init(config: &StoreConfig) -> Result<Arc<PresenceService<EtcdStore>>, PresenceError> {
    let service = SERVICE
        .get_or_try_init(|| async {
            let store = EtcdStore::connect(config).await?;
            Ok::<_, PresenceError>(Arc::new(PresenceService::new(store)))
        })
        .await?;

    Ok(service.clone())
}

/// The already-initialized service, if [`init`] has completed.
pub fn try_get() -> Result<Arc<PresenceService<EtcdStore>>, PresenceError> {
    SERVICE.get().cloned().ok_or(PresenceError::NotInitialized)
}
