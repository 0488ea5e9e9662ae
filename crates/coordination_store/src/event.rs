//! Change events delivered by prefix watches.

/// One key/value pair as carried by a change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValuePair {
    pub key: String,
    pub value: Vec<u8>,
}

impl KeyValuePair {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The kind of mutation a change event describes.
///
/// `Other` exists for forward compatibility: backends may grow new action
/// kinds, and consumers are expected to skip the ones they do not recognize
/// rather than fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeAction {
    /// A key was created or overwritten.
    Set,
    /// A key's lease lapsed and the store removed it.
    Expire,
    /// A key was explicitly deleted.
    Delete,
    /// An action this client does not understand.
    Other(String),
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeAction::Set => f.write_str("set"),
            ChangeAction::Expire => f.write_str("expire"),
            ChangeAction::Delete => f.write_str("delete"),
            ChangeAction::Other(action) => f.write_str(action),
        }
    }
}

/// A single mutation observed on a watched prefix.
///
/// `node` carries the current pair for set and delete events; `prev_node`
/// carries the pair as it existed before an expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub action: ChangeAction,
    pub node: Option<KeyValuePair>,
    pub prev_node: Option<KeyValuePair>,
}

impl ChangeEvent {
    pub fn set(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            action: ChangeAction::Set,
            node: Some(KeyValuePair::new(key, value)),
            prev_node: None,
        }
    }

    pub fn expire(prev_key: impl Into<String>, prev_value: impl Into<Vec<u8>>) -> Self {
        Self {
            action: ChangeAction::Expire,
            node: None,
            prev_node: Some(KeyValuePair::new(prev_key, prev_value)),
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            action: ChangeAction::Delete,
            node: Some(KeyValuePair::new(key, Vec::new())),
            prev_node: None,
        }
    }

    pub fn other(action: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            action: ChangeAction::Other(action.into()),
            node: Some(KeyValuePair::new(key, Vec::new())),
            prev_node: None,
        }
    }

    /// The key this event is about: the previous pair's key for expirations,
    /// the current pair's key otherwise.
    pub fn subject_key(&self) -> Option<&str> {
        match self.action {
            ChangeAction::Expire => self.prev_node.as_ref().map(|pair| pair.key.as_str()),
            _ => self.node.as_ref().map(|pair| pair.key.as_str()),
        }
    }
}

/// Extract the trailing path segment of a key.
///
/// Keys in the store are slash-separated paths whose last segment is the
/// entity id. Returns `None` when the key has no non-empty trailing segment.
pub fn last_segment(key: &str) -> Option<&str> {
    key.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
}
