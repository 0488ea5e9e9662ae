//! User CRUD resource.
//!
//! Plain request-to-store mapping: user records are JSON blobs under the
//! users namespace and the store is the single source of truth. The only
//! logic here is id assignment on create; ids are always taken from the
//! store key, never trusted from a stored payload.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use coordination_store::last_segment;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;
use uuid::Uuid;

/// Store namespace user records live under.
pub const USERS_PREFIX: &str = "users/";

/// One user record as persisted and served.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub password: String,
    pub created: u64,
}

/// Client-supplied fields for create and update.
#[derive(Debug, Clone, Deserialize)]
pub struct UserPayload {
    pub name: String,
    #[serde(default)]
    pub password: String,
}

fn user_key(id: &str) -> String {
    format!("{USERS_PREFIX}{id}")
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

fn decode_user(id: &str, bytes: &[u8]) -> ApiResult<User> {
    let mut user: User = serde_json::from_slice(bytes)
        .map_err(|err| ApiError::BadPayload(format!("stored user {id} is corrupt: {err}")))?;
    user.id = id.to_string();
    Ok(user)
}

/// `GET /users`
///
/// A record that fails to decode is skipped rather than failing the whole
/// listing; fetching it by id reports the corruption.
pub async fn find_all_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    let pairs = state.store.get_prefix(USERS_PREFIX).await?;

    let mut users = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let Some(id) = last_segment(&pair.key) else {
            continue;
        };
        match decode_user(id, &pair.value) {
            Ok(user) => users.push(user),
            Err(err) => warn!(user = %id, error = %err, "Skipping undecodable user record"),
        }
    }
    Ok(Json(users))
}

/// `GET /users/:id`
pub async fn find_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    match state.store.get(&user_key(&id)).await? {
        Some(bytes) => Ok(Json(decode_user(&id, &bytes)?)),
        None => Err(ApiError::NotFound(format!("user {id}"))),
    }
}

/// `POST /users` - create with a freshly assigned id.
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<UserPayload>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = User {
        id: Uuid::new_v4().to_string(),
        name: payload.name,
        password: payload.password,
        created: unix_timestamp(),
    };

    let bytes = serde_json::to_vec(&user)
        .map_err(|err| ApiError::BadPayload(err.to_string()))?;
    state.store.put(&user_key(&user.id), bytes).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// `PUT /users/:id` - write the record under the path id, creating it if
/// absent. The original creation timestamp is preserved when one exists.
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UserPayload>,
) -> ApiResult<Json<User>> {
    let created = match state.store.get(&user_key(&id)).await? {
        Some(bytes) => decode_user(&id, &bytes)?.created,
        None => unix_timestamp(),
    };

    let user = User {
        id: id.clone(),
        name: payload.name,
        password: payload.password,
        created,
    };

    let bytes = serde_json::to_vec(&user)
        .map_err(|err| ApiError::BadPayload(err.to_string()))?;
    state.store.put(&user_key(&id), bytes).await?;

    Ok(Json(user))
}

/// `DELETE /users/:id` - idempotent; deleting an absent user succeeds.
pub async fn remove_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.delete(&user_key(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
