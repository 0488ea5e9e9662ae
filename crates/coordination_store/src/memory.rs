//! In-process coordination store.
//!
//! Mirrors the observable semantics of the etcd backend (ordered change
//! events per prefix watch, expire vs delete distinction) without any
//! network. Integration tests drive the presence pipeline through this
//! store; it has no durability and is not meant for production use.

use crate::error::StoreError;
use crate::event::{ChangeEvent, KeyValuePair};
use crate::{EventSource, KeyValueStore, Result, WatchableStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Default)]
struct Inner {
    data: Mutex<BTreeMap<String, Vec<u8>>>,
    watchers: Mutex<Vec<(String, mpsc::UnboundedSender<ChangeEvent>)>>,
}

/// Shared-handle in-process store. Cloning is cheap and all clones observe
/// the same data and watchers.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a lease lapse: the key is removed and watchers receive an
    /// expire event carrying the previous pair.
    pub fn expire(&self, key: &str) {
        let mut data = self.inner.data.lock();
        if let Some(value) = data.remove(key) {
            self.publish(ChangeEvent::expire(key, value));
        }
    }

    /// Deliver an arbitrary event to matching watchers without touching the
    /// data. Lets tests exercise event kinds the store itself never emits.
    pub fn publish(&self, event: ChangeEvent) {
        let subject = match event.subject_key() {
            Some(key) => key.to_string(),
            None => return,
        };

        let mut watchers = self.inner.watchers.lock();
        watchers.retain(|(prefix, sender)| {
            if subject.starts_with(prefix.as_str()) {
                sender.send(event.clone()).is_ok()
            } else {
                !sender.is_closed()
            }
        });
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.inner.data.lock().get(key).cloned())
    }

    async fn get_prefix(&self, prefix: &str) -> Result<Vec<KeyValuePair>> {
        let data = self.inner.data.lock();
        Ok(data
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| KeyValuePair::new(key.clone(), value.clone()))
            .collect())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        // The data lock is held across publish so watchers observe events in
        // the same order the map was mutated.
        let mut data = self.inner.data.lock();
        data.insert(key.to_string(), value.clone());
        self.publish(ChangeEvent::set(key, value));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut data = self.inner.data.lock();
        if data.remove(key).is_some() {
            self.publish(ChangeEvent::delete(key));
        }
        Ok(())
    }
}

#[async_trait]
impl WatchableStore for MemoryStore {
    type Watch = MemoryWatch;

    async fn watch_prefix(&self, prefix: &str) -> Result<MemoryWatch> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.inner
            .watchers
            .lock()
            .push((prefix.to_string(), sender));
        Ok(MemoryWatch { receiver })
    }
}

/// Receiving half of an in-process prefix watch.
pub struct MemoryWatch {
    receiver: mpsc::UnboundedReceiver<ChangeEvent>,
}

#[async_trait]
impl EventSource for MemoryWatch {
    async fn next_event(&mut self) -> std::result::Result<Option<ChangeEvent>, StoreError> {
        Ok(self.receiver.recv().await)
    }
}
