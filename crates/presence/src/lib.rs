//! Player presence tracking.
//!
//! Worker agents register themselves in the coordination store under the
//! players namespace, renewing a lease as long as they are alive. This crate
//! turns the store's change-notification stream for that namespace into an
//! authoritative, queryable in-memory view of who is online:
//!
//! * [`PresenceRegistry`] - the shared map of player records, written by one
//!   background task and read by any number of request handlers.
//! * [`Reconciler`] - the loop that classifies change events and applies them
//!   to the registry.
//! * [`PresenceService`] - the process-wide singleton owning the registry,
//!   the store handle, and the reconciler's supervision.
//!
//! A reader always observes a fully-applied mutation or none of it; stale
//! reads are possible (the view trails the store by whatever the watch
//! stream's latency is), torn reads are not.

pub mod error;
pub mod player;
pub mod reconciler;
pub mod registry;
pub mod service;

pub use error::PresenceError;
pub use player::{Player, PlayerInfo};
pub use reconciler::Reconciler;
pub use registry::PresenceRegistry;
pub use service::{init, try_get, PresenceService};

/// Store namespace that player registrations live under. The trailing path
/// segment of each key is the player id.
pub const PLAYERS_PREFIX: &str = "players/";
