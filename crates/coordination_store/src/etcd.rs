//! etcd-backed coordination store.
//!
//! Wraps an [`etcd_client::Client`] behind the crate's narrow store traits.
//! All keys are scoped under a configurable namespace prefix so several
//! deployments can share one etcd cluster.

use crate::error::StoreError;
use crate::event::{ChangeAction, ChangeEvent, KeyValuePair};
use crate::{EventSource, KeyValueStore, Result, WatchableStore};
use async_trait::async_trait;
use etcd_client::{Client, ConnectOptions, Event, EventType, GetOptions, WatchOptions, Watcher, WatchStream};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

/// Connection settings for the etcd backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// etcd endpoints, e.g. `http://127.0.0.1:2379`.
    pub endpoints: Vec<String>,
    /// Namespace prefix prepended to every key.
    pub namespace: String,
    /// Dial timeout for the initial connection.
    pub connect_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["http://127.0.0.1:2379".to_string()],
            namespace: "podium".to_string(),
            connect_timeout_secs: 5,
        }
    }
}

/// Coordination store client backed by etcd.
#[derive(Clone)]
pub struct EtcdStore {
    client: Client,
    namespace: String,
}

impl EtcdStore {
    /// Connect to the cluster described by `config`.
    ///
    /// The connection is required for the process to operate; callers treat
    /// a failure here as fatal.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        if config.endpoints.is_empty() {
            return Err(StoreError::Connect("no store endpoints configured".to_string()));
        }

        let options = ConnectOptions::new()
            .with_connect_timeout(Duration::from_secs(config.connect_timeout_secs));
        let client = Client::connect(&config.endpoints, Some(options)).await?;
        debug!("Connected to coordination store at {:?}", config.endpoints);

        Ok(Self {
            client,
            namespace: config.namespace.trim_matches('/').to_string(),
        })
    }

    fn scoped(&self, key: &str) -> String {
        scoped(&self.namespace, key)
    }
}

fn scoped(namespace: &str, key: &str) -> String {
    if namespace.is_empty() {
        key.to_string()
    } else {
        format!("{}/{}", namespace, key)
    }
}

#[async_trait]
impl KeyValueStore for EtcdStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut client = self.client.clone();
        let resp = client.get(self.scoped(key), None).await?;
        Ok(resp.kvs().first().map(|kv| kv.value().to_vec()))
    }

    async fn get_prefix(&self, prefix: &str) -> Result<Vec<KeyValuePair>> {
        let mut client = self.client.clone();
        let resp = client
            .get(self.scoped(prefix), Some(GetOptions::new().with_prefix()))
            .await?;

        let mut pairs = Vec::with_capacity(resp.kvs().len());
        for kv in resp.kvs() {
            pairs.push(KeyValuePair::new(kv.key_str()?, kv.value()));
        }
        Ok(pairs)
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut client = self.client.clone();
        client.put(self.scoped(key), value, None).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut client = self.client.clone();
        client.delete(self.scoped(key), None).await?;
        Ok(())
    }
}

#[async_trait]
impl WatchableStore for EtcdStore {
    type Watch = EtcdWatch;

    async fn watch_prefix(&self, prefix: &str) -> Result<EtcdWatch> {
        let mut client = self.client.clone();
        let options = WatchOptions::new().with_prefix().with_prev_key();
        let (watcher, stream) = client.watch(self.scoped(prefix), Some(options)).await?;

        Ok(EtcdWatch {
            watcher,
            stream,
            pending: VecDeque::new(),
        })
    }
}

/// A live prefix watch on etcd.
///
/// etcd batches several mutations into one watch response; the adapter
/// flattens them back into the one-event-at-a-time sequence consumers expect.
pub struct EtcdWatch {
    // Held so the server-side watch stays registered for the stream's lifetime.
    watcher: Watcher,
    stream: WatchStream,
    pending: VecDeque<ChangeEvent>,
}

impl EtcdWatch {
    /// Cancel the watch on the server and release the subscription.
    pub async fn cancel(&mut self) -> Result<()> {
        self.watcher.cancel().await?;
        Ok(())
    }
}

#[async_trait]
impl EventSource for EtcdWatch {
    async fn next_event(&mut self) -> Result<Option<ChangeEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }

            match self.stream.message().await? {
                Some(resp) => {
                    if resp.canceled() {
                        return Err(StoreError::Closed);
                    }
                    for event in resp.events() {
                        self.pending.push_back(map_event(event)?);
                    }
                }
                None => return Ok(None),
            }
        }
    }
}

/// Translate one etcd event into the store-neutral [`ChangeEvent`] shape.
///
/// etcd v3 reports a lease lapse as a plain delete; the previous pair's lease
/// id is what distinguishes the two. A deleted key that held a lease is
/// reported as an expiry, an unleased one as an explicit delete.
fn map_event(event: &Event) -> Result<ChangeEvent> {
    let kv = event
        .kv()
        .ok_or_else(|| StoreError::InvalidKey("event without key/value".to_string()))?;
    let key = kv.key_str()?.to_string();

    match event.event_type() {
        EventType::Put => Ok(ChangeEvent::set(key, kv.value())),
        EventType::Delete => match event.prev_kv() {
            Some(prev) if prev.lease() != 0 => {
                Ok(ChangeEvent::expire(prev.key_str()?, prev.value()))
            }
            _ => Ok(ChangeEvent {
                action: ChangeAction::Delete,
                node: Some(KeyValuePair::new(key, Vec::new())),
                prev_node: event
                    .prev_kv()
                    .map(|prev| {
                        Ok::<_, StoreError>(KeyValuePair::new(prev.key_str()?, prev.value()))
                    })
                    .transpose()?,
            }),
        },
    }
}
