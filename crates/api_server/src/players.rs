//! Player presence endpoints.
//!
//! Read-only views over the presence registry; the registry itself is kept
//! current by the background reconciler, so these handlers never touch the
//! store.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use presence::Player;

/// List every known player, online and offline.
pub async fn list_players(State(state): State<AppState>) -> Json<Vec<Player>> {
    Json(state.registry.list())
}

/// Fetch one player by id.
pub async fn find_player(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Player>> {
    state
        .registry
        .get(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("player {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use coordination_store::MemoryStore;
    use presence::{PlayerInfo, PresenceRegistry};
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::new(
            Arc::new(PresenceRegistry::new()),
            Arc::new(MemoryStore::new()),
        )
    }

    #[tokio::test]
    async fn find_player_reports_absence_as_not_found() {
        let state = state();
        let result = find_player(State(state), Path("nobody".to_string())).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_players_reflects_the_registry() {
        let state = state();
        state.registry.upsert(
            "p1",
            PlayerInfo {
                id: String::new(),
                ips: vec!["10.0.0.1".to_string()],
                hostname: "h1".to_string(),
                cpu: 4,
            },
            true,
        );

        let Json(players) = list_players(State(state.clone())).await;
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].id, "p1");

        let Json(player) = find_player(State(state), Path("p1".to_string()))
            .await
            .expect("p1 should be present");
        assert!(player.online);
    }
}
