//! Player records and wire decoding.

use serde::{Deserialize, Serialize};

/// Registration payload a worker agent writes under the players namespace.
///
/// Decoded from a single change event's value and discarded once applied;
/// it has no lifecycle of its own. The `id` field is whatever the agent
/// claimed and is never trusted - the authoritative id is the trailing
/// segment of the store key the payload arrived under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub ips: Vec<String>,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub cpu: u32,
}

impl PlayerInfo {
    /// Decode a registration payload from its JSON wire form.
    ///
    /// Missing fields default (agents may omit what they do not know);
    /// anything that is not a JSON object of the right shape is rejected,
    /// which is the "malformed payload" case callers drop and log.
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// One player as tracked by the registry.
///
/// `online` reflects the last observed transition: true after a set, false
/// after an expiry. An offline player keeps its last known addresses and
/// capacity so they remain queryable until the record is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub ips: Vec<String>,
    pub hostname: String,
    pub cpu: u32,
    pub online: bool,
}
