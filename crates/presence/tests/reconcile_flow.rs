//! End-to-end presence flow over the in-process store: seed, watch,
//! reconcile, query.

use coordination_store::{KeyValueStore, MemoryStore};
use presence::{PresenceRegistry, PresenceService};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

fn payload(hostname: &str, cpu: u32) -> Vec<u8> {
    format!(r#"{{"id":"wire","ips":["10.0.0.1"],"hostname":"{hostname}","cpu":{cpu}}}"#)
        .into_bytes()
}

/// Poll until `check` passes or a generous deadline expires. Event delivery
/// crosses a channel, so registry updates are observed asynchronously.
async fn wait_for(registry: &Arc<PresenceRegistry>, check: impl Fn(&PresenceRegistry) -> bool) {
    for _ in 0..200 {
        if check(registry) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("registry never reached the expected state");
}

/// Spin up a service over a fresh store and start its supervision loop.
fn start_service(store: &MemoryStore) -> (Arc<PresenceRegistry>, broadcast::Sender<()>) {
    let service = Arc::new(PresenceService::new(store.clone()));
    let registry = service.registry();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    tokio::spawn(async move { service.run(shutdown_rx).await });
    (registry, shutdown_tx)
}

#[tokio::test]
async fn player_lifecycle_set_expire_refresh_delete() {
    let store = MemoryStore::new();
    let (registry, _shutdown) = start_service(&store);

    // set -> online with decoded fields, id taken from the key
    store
        .put("players/p1", payload("h1", 4))
        .await
        .expect("put should succeed");
    wait_for(&registry, |r| r.get("p1").is_some()).await;
    let player = registry.get("p1").unwrap();
    assert!(player.online);
    assert_eq!(player.id, "p1");
    assert_eq!(player.ips, vec!["10.0.0.1".to_string()]);
    assert_eq!(player.hostname, "h1");
    assert_eq!(player.cpu, 4);

    // expire -> same record, offline
    store.expire("players/p1");
    wait_for(&registry, |r| {
        r.get("p1").map(|p| !p.online).unwrap_or(false)
    })
    .await;
    assert_eq!(registry.get("p1").unwrap().hostname, "h1");

    // set again -> back online with refreshed capacity
    store
        .put("players/p1", payload("h1", 8))
        .await
        .expect("put should succeed");
    wait_for(&registry, |r| {
        r.get("p1").map(|p| p.online && p.cpu == 8).unwrap_or(false)
    })
    .await;

    // delete -> gone entirely
    store
        .delete("players/p1")
        .await
        .expect("delete should succeed");
    wait_for(&registry, |r| r.get("p1").is_none()).await;
    assert!(registry.list().iter().all(|p| p.id != "p1"));
}

#[tokio::test]
async fn expire_for_never_seen_player_changes_nothing() {
    let store = MemoryStore::new();
    let (registry, _shutdown) = start_service(&store);

    store
        .put("players/known", payload("h1", 2))
        .await
        .expect("put should succeed");
    wait_for(&registry, |r| r.get("known").is_some()).await;

    // The store never held this key, but a stale expire can still arrive.
    store.publish(coordination_store::ChangeEvent::expire(
        "players/stranger",
        payload("s", 1),
    ));

    // Process a subsequent event to be sure the expire went through the loop.
    store
        .put("players/known2", payload("h2", 2))
        .await
        .expect("put should succeed");
    wait_for(&registry, |r| r.get("known2").is_some()).await;

    assert_eq!(registry.len(), 2);
    assert!(registry.get("stranger").is_none());
}

#[tokio::test]
async fn seed_picks_up_players_registered_before_startup() {
    let store = MemoryStore::new();
    store
        .put("players/early", payload("h0", 16))
        .await
        .expect("put should succeed");
    store
        .put("players/broken", b"not json".to_vec())
        .await
        .expect("put should succeed");

    let service = PresenceService::new(store.clone());
    service.seed().await.expect("seed should succeed");

    let registry = service.registry();
    assert_eq!(registry.len(), 1);
    let early = registry.get("early").unwrap();
    assert!(early.online);
    assert_eq!(early.cpu, 16);
}

#[tokio::test]
async fn supervision_stops_on_shutdown() {
    let store = MemoryStore::new();
    let service = Arc::new(PresenceService::new(store.clone()));
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let runner = tokio::spawn({
        let service = service.clone();
        async move { service.run(shutdown_rx).await }
    });

    store
        .put("players/p1", payload("h1", 4))
        .await
        .expect("put should succeed");
    wait_for(&service.registry(), |r| r.get("p1").is_some()).await;

    shutdown_tx.send(()).expect("runner is alive");
    tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("supervision should stop promptly")
        .expect("runner should not panic");
}
