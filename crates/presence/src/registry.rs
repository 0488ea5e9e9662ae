//! Shared registry of player records.
//!
//! One background task (the reconciler) performs all writes; request
//! handlers read concurrently. A coarse read/write lock around the whole
//! map keeps every mutation atomic with respect to readers - `list` clones
//! under the read lock, so an enumeration is always a consistent snapshot.

use crate::player::{Player, PlayerInfo};
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Thread-safe map of player id to player record.
#[derive(Default)]
pub struct PresenceRegistry {
    players: RwLock<HashMap<String, Player>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up one player. `None` is the typed "absent" signal; callers can
    /// distinguish it from a present record with empty fields.
    pub fn get(&self, id: &str) -> Option<Player> {
        self.players.read().get(id).cloned()
    }

    /// Snapshot of every player at the time of the call.
    pub fn list(&self) -> Vec<Player> {
        self.players.read().values().cloned().collect()
    }

    /// Insert or refresh a player from a decoded registration.
    ///
    /// An unseen id creates a record with `online = true`. A known id has
    /// its fields overwritten; its `online` flag is preserved unless
    /// `mark_online` asks for the transition. Returns `true` when the
    /// player was newly added.
    pub fn upsert(&self, id: &str, info: PlayerInfo, mark_online: bool) -> bool {
        let mut players = self.players.write();
        match players.entry(id.to_string()) {
            Entry::Occupied(mut entry) => {
                let player = entry.get_mut();
                player.ips = info.ips;
                player.hostname = info.hostname;
                player.cpu = info.cpu;
                if mark_online {
                    player.online = true;
                }
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(Player {
                    id: id.to_string(),
                    ips: info.ips,
                    hostname: info.hostname,
                    cpu: info.cpu,
                    online: true,
                });
                true
            }
        }
    }

    /// Flip a player offline, keeping the rest of the record for last-known
    /// queries. Returns `false` (not an error) when the id is unknown - the
    /// registry may simply not have observed the corresponding creation.
    pub fn mark_offline(&self, id: &str) -> bool {
        match self.players.write().get_mut(id) {
            Some(player) => {
                player.online = false;
                true
            }
            None => false,
        }
    }

    /// Drop a player entirely. Returns `false` when the id was absent.
    pub fn remove(&self, id: &str) -> bool {
        self.players.write().remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.players.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.read().is_empty()
    }

    /// Number of players currently online.
    pub fn online_count(&self) -> usize {
        self.players
            .read()
            .values()
            .filter(|player| player.online)
            .count()
    }
}
