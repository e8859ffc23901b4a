pub mod admin;
pub mod auth;
pub mod error;

use axum::middleware;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use sk_sessions::{expiry, redact, SessionRecord};

use crate::state::AppState;

/// Build the full API router.
///
/// Routes are split into **public** (login flow, health) and **admin**
/// (gated behind the admin bearer-token middleware).
///
/// `state` is needed to wire up the auth middleware at build time.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/health", get(health))
        .route("/v1/login", post(auth::login))
        .route("/v1/logout", post(auth::logout))
        .route("/v1/session", get(auth::current_session));

    let admin = Router::new()
        .route("/v1/admin/sessions", get(admin::list_sessions))
        .route("/v1/admin/sweep", post(admin::sweep))
        .route("/v1/admin/users", get(admin::list_users))
        .route(
            "/v1/admin/users/:username/sessions",
            get(admin::count_user_sessions).delete(admin::revoke_user_sessions),
        )
        .route("/v1/admin/users/:username/disable", post(admin::disable_user))
        .route("/v1/admin/users/:username/enable", post(admin::enable_user))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_admin_token,
        ));

    public.merge(admin)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Client-facing description of a session.  The id is always redacted.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub idle_sec: i64,
    pub remote_addr: String,
    pub remote_host: String,
    pub user_agent: String,
}

impl SessionView {
    pub fn from_record(record: &SessionRecord, now: DateTime<Utc>) -> Self {
        Self {
            session: redact(record.session_id()),
            username: record.username().to_owned(),
            created_at: record.created_at(),
            last_accessed_at: record.last_accessed_at(),
            idle_sec: expiry::idle_ms(record, now).max(0) / 1000,
            remote_addr: record.remote_addr().to_owned(),
            remote_host: record.remote_host().to_owned(),
            user_agent: record.user_agent().to_owned(),
        }
    }
}
