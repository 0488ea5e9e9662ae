//! Change-event reconciliation loop.
//!
//! A single reconciler task consumes the store's watch stream for the
//! players namespace and applies each event to the registry. Per player the
//! state machine is: unknown -> online (set) -> offline (expire) -> online
//! again (set), with delete removing the record from any state. Whether a
//! set is an add or an update is decided by registry membership, never by
//! event metadata.

use crate::registry::PresenceRegistry;
use crate::player::PlayerInfo;
use coordination_store::{last_segment, ChangeAction, ChangeEvent, EventSource, StoreError};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Applies a change-event sequence to a [`PresenceRegistry`].
pub struct Reconciler<S> {
    registry: Arc<PresenceRegistry>,
    source: S,
}

impl<S: EventSource> Reconciler<S> {
    pub fn new(registry: Arc<PresenceRegistry>, source: S) -> Self {
        Self { registry, source }
    }

    /// Drive the loop until the stream dies or shutdown fires.
    ///
    /// Shutdown is a normal stream-closed condition and returns `Ok(())`.
    /// A stream-level failure (transport error, or the source ending on its
    /// own) is surfaced to the caller, who owns the restart policy. A
    /// malformed event only costs that event - the loop keeps consuming.
    pub async fn run(mut self, shutdown: &mut broadcast::Receiver<()>) -> Result<(), StoreError> {
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Presence reconciler stopping");
                    return Ok(());
                }
                event = self.source.next_event() => match event {
                    Ok(Some(event)) => self.apply(event),
                    Ok(None) => return Err(StoreError::Closed),
                    Err(err) => return Err(err),
                },
            }
        }
    }

    /// Classify one event and mutate the registry accordingly.
    fn apply(&self, event: ChangeEvent) {
        match event.action {
            ChangeAction::Set => {
                let Some(node) = event.node else {
                    warn!("Set event carried no key/value, dropping");
                    return;
                };
                let Some(id) = last_segment(&node.key) else {
                    warn!(key = %node.key, "Set event key has no player id, dropping");
                    return;
                };
                let info = match PlayerInfo::decode(&node.value) {
                    Ok(info) => info,
                    Err(err) => {
                        warn!(player = %id, error = %err, "Dropping malformed player payload");
                        return;
                    }
                };
                if self.registry.upsert(id, info, true) {
                    info!(player = %id, "Player online");
                } else {
                    debug!(player = %id, "Player refreshed");
                }
            }
            ChangeAction::Expire => {
                let Some(id) = event
                    .prev_node
                    .as_ref()
                    .and_then(|prev| last_segment(&prev.key))
                else {
                    warn!("Expire event carried no usable previous key, dropping");
                    return;
                };
                if self.registry.mark_offline(id) {
                    info!(player = %id, "Player expired");
                } else {
                    // Tolerated: the key may predate this process.
                    debug!(player = %id, "Expire for unknown player ignored");
                }
            }
            ChangeAction::Delete => {
                let Some(id) = event.node.as_ref().and_then(|node| last_segment(&node.key))
                else {
                    warn!("Delete event carried no usable key, dropping");
                    return;
                };
                if self.registry.remove(id) {
                    info!(player = %id, "Player removed");
                } else {
                    debug!(player = %id, "Delete for unknown player ignored");
                }
            }
            ChangeAction::Other(action) => {
                warn!(%action, "Ignoring unrecognized change action");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    /// Event source that replays a fixed script, then reports end-of-stream.
    struct ScriptedSource {
        events: VecDeque<Result<ChangeEvent, StoreError>>,
    }

    impl ScriptedSource {
        fn new(events: Vec<ChangeEvent>) -> Self {
            Self {
                events: events.into_iter().map(Ok).collect(),
            }
        }

        fn push_err(mut self, err: StoreError) -> Self {
            self.events.push_back(Err(err));
            self
        }
    }

    #[async_trait]
    impl EventSource for ScriptedSource {
        async fn next_event(&mut self) -> Result<Option<ChangeEvent>, StoreError> {
            match self.events.pop_front() {
                Some(Ok(event)) => Ok(Some(event)),
                Some(Err(err)) => Err(err),
                None => Ok(None),
            }
        }
    }

    /// Run a script to exhaustion and hand back the registry.
    async fn reconcile(events: Vec<ChangeEvent>) -> Arc<PresenceRegistry> {
        let registry = Arc::new(PresenceRegistry::new());
        let reconciler = Reconciler::new(registry.clone(), ScriptedSource::new(events));
        let (_tx, mut rx) = broadcast::channel(1);

        let result = reconciler.run(&mut rx).await;
        assert!(matches!(result, Err(StoreError::Closed)));
        registry
    }

    fn payload(hostname: &str, cpu: u32) -> Vec<u8> {
        format!(
            r#"{{"id":"ignored","ips":["10.0.0.1"],"hostname":"{hostname}","cpu":{cpu}}}"#
        )
        .into_bytes()
    }

    #[tokio::test]
    async fn set_brings_a_player_online() {
        let registry = reconcile(vec![ChangeEvent::set("players/p1", payload("h1", 4))]).await;

        let player = registry.get("p1").expect("p1 should be registered");
        assert!(player.online);
        assert_eq!(player.hostname, "h1");
        assert_eq!(player.cpu, 4);
        // The id comes from the key, not the payload body.
        assert_eq!(player.id, "p1");
    }

    #[tokio::test]
    async fn applying_the_same_set_twice_is_idempotent() {
        let event = ChangeEvent::set("players/p1", payload("h1", 4));
        let once = reconcile(vec![event.clone()]).await;
        let twice = reconcile(vec![event.clone(), event]).await;

        assert_eq!(once.get("p1"), twice.get("p1"));
        assert_eq!(twice.len(), 1);
    }

    #[tokio::test]
    async fn expire_flips_offline_but_keeps_the_record() {
        let registry = reconcile(vec![
            ChangeEvent::set("players/p1", payload("h1", 4)),
            ChangeEvent::expire("players/p1", payload("h1", 4)),
        ])
        .await;

        let player = registry.get("p1").expect("record should survive expiry");
        assert!(!player.online);
        assert_eq!(player.hostname, "h1");
    }

    #[tokio::test]
    async fn set_after_expire_comes_back_online_with_new_fields() {
        let registry = reconcile(vec![
            ChangeEvent::set("players/p1", payload("h1", 4)),
            ChangeEvent::expire("players/p1", payload("h1", 4)),
            ChangeEvent::set("players/p1", payload("h1", 8)),
        ])
        .await;

        let player = registry.get("p1").unwrap();
        assert!(player.online);
        assert_eq!(player.cpu, 8);
    }

    #[tokio::test]
    async fn delete_removes_from_any_state() {
        let registry = reconcile(vec![
            ChangeEvent::set("players/p1", payload("h1", 4)),
            ChangeEvent::delete("players/p1"),
        ])
        .await;

        assert_eq!(registry.get("p1"), None);
        assert!(registry.list().is_empty());
    }

    #[tokio::test]
    async fn unknown_id_expire_and_delete_are_tolerated() {
        let registry = reconcile(vec![
            ChangeEvent::set("players/p1", payload("h1", 4)),
            ChangeEvent::expire("players/ghost", payload("g", 1)),
            ChangeEvent::delete("players/phantom"),
        ])
        .await;

        // Nothing spurious appeared and the loop kept going.
        assert_eq!(registry.len(), 1);
        assert!(registry.get("p1").unwrap().online);
    }

    #[tokio::test]
    async fn malformed_payload_skips_only_that_event() {
        let registry = reconcile(vec![
            ChangeEvent::set("players/p1", payload("h1", 4)),
            ChangeEvent::set("players/p1", b"not json".to_vec()),
            ChangeEvent::set("players/p2", payload("h2", 2)),
        ])
        .await;

        // p1 is untouched by the malformed refresh, p2 was still processed.
        assert_eq!(registry.get("p1").unwrap().cpu, 4);
        assert!(registry.get("p2").is_some());
    }

    #[tokio::test]
    async fn unrecognized_actions_are_ignored() {
        let registry = reconcile(vec![
            ChangeEvent::other("compareAndSwap", "players/p1"),
            ChangeEvent::set("players/p1", payload("h1", 4)),
        ])
        .await;

        assert!(registry.get("p1").is_some());
    }

    #[tokio::test]
    async fn stream_errors_are_surfaced_to_the_caller() {
        let registry = Arc::new(PresenceRegistry::new());
        let source = ScriptedSource::new(vec![ChangeEvent::set("players/p1", payload("h1", 4))])
            .push_err(StoreError::Connect("store went away".to_string()));
        let reconciler = Reconciler::new(registry.clone(), source);
        let (_tx, mut rx) = broadcast::channel(1);

        let result = reconciler.run(&mut rx).await;
        assert!(matches!(result, Err(StoreError::Connect(_))));
        // Events before the failure were applied.
        assert!(registry.get("p1").is_some());
    }

    #[tokio::test]
    async fn shutdown_ends_the_loop_cleanly() {
        /// Source that never yields - the loop must leave via shutdown.
        struct PendingSource;

        #[async_trait]
        impl EventSource for PendingSource {
            async fn next_event(&mut self) -> Result<Option<ChangeEvent>, StoreError> {
                std::future::pending().await
            }
        }

        let registry = Arc::new(PresenceRegistry::new());
        let reconciler = Reconciler::new(registry, PendingSource);
        let (tx, mut rx) = broadcast::channel(1);

        tx.send(()).expect("receiver is alive");
        let result = reconciler.run(&mut rx).await;
        assert!(result.is_ok());
    }
}
