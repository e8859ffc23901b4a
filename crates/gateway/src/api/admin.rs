//! Admin endpoints: inspect and revoke sessions, disable accounts.

use axum::extract::{Path, State};
use axum::response::Json;
use chrono::Utc;
use serde_json::{json, Value};

use sk_domain::directory::UserInfo;

use crate::api::error::ApiError;
use crate::api::SessionView;
use crate::state::AppState;

/// `GET /v1/admin/sessions`
pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionView>> {
    let now = Utc::now();
    let mut sessions: Vec<SessionView> = state
        .sessions
        .list_sessions()
        .iter()
        .map(|r| SessionView::from_record(r, now))
        .collect();
    sessions.sort_by(|a, b| a.username.cmp(&b.username).then(a.created_at.cmp(&b.created_at)));
    Json(sessions)
}

/// `GET /v1/admin/users`
pub async fn list_users(State(state): State<AppState>) -> Json<Vec<Value>> {
    let mut users: Vec<UserInfo> = state.users.list();
    users.sort_by(|a, b| a.username.cmp(&b.username));
    Json(
        users
            .into_iter()
            .map(|u| {
                let active = state.sessions.count_active_for_user(&u.username);
                json!({
                    "username": u.username,
                    "admin": u.admin,
                    "disabled": u.disabled,
                    "active_sessions": active,
                })
            })
            .collect(),
    )
}

/// `GET /v1/admin/users/:username/sessions`
pub async fn count_user_sessions(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Json<Value> {
    let active = state.sessions.count_active_for_user(&username);
    Json(json!({ "username": username, "active_sessions": active }))
}

/// `DELETE /v1/admin/users/:username/sessions`
pub async fn revoke_user_sessions(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Json<Value> {
    let revoked = state.sessions.revoke_all_for_user(&username);
    Json(json!({ "username": username, "revoked": revoked }))
}

/// `POST /v1/admin/users/:username/disable`
///
/// Disabling an account also revokes all of its sessions.
pub async fn disable_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.users.set_disabled(&username, true) {
        return Err(ApiError::NotFound(format!("user not found: {username}")));
    }
    let revoked = state.sessions.revoke_all_for_user(&username);
    tracing::info!(username = %username, revoked, "user disabled");
    Ok(Json(json!({ "username": username, "disabled": true, "revoked": revoked })))
}

/// `POST /v1/admin/users/:username/enable`
pub async fn enable_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.users.set_disabled(&username, false) {
        return Err(ApiError::NotFound(format!("user not found: {username}")));
    }
    tracing::info!(username = %username, "user enabled");
    Ok(Json(json!({ "username": username, "disabled": false })))
}

/// `POST /v1/admin/sweep`
pub async fn sweep(State(state): State<AppState>) -> Json<Value> {
    let expired = state.sessions.sweep_expired(Utc::now());
    Json(json!({ "expired": expired, "active": state.sessions.store().len() }))
}
