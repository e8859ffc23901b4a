//! Login, logout and current-session endpoints, plus the admin guard.
//!
//! The session token travels in a cookie (`sessions.cookie_name`).  Every
//! handler wraps the request in a [`CookieTransport`] so the lifecycle
//! service can read and rebind it.

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use sk_sessions::{redact, TransportBinding};

use crate::api::error::ApiError;
use crate::api::SessionView;
use crate::state::AppState;
use crate::transport::CookieTransport;

fn cookie_transport(
    state: &AppState,
    headers: &HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
) -> CookieTransport {
    CookieTransport::from_request(
        &state.config.sessions.cookie_name,
        headers,
        peer.map(|ConnectInfo(addr)| addr),
    )
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/login
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(body): Json<LoginBody>,
) -> Result<Response, ApiError> {
    if !state.users.verify_password(&body.username, &body.password) {
        tracing::warn!(username = %body.username, "login rejected");
        return Err(ApiError::Unauthorized("invalid username or password".into()));
    }

    let mut transport = cookie_transport(&state, &headers, peer);
    let session_id = state
        .sessions
        .issue(&body.username, &mut transport, Utc::now());

    let response = Json(json!({
        "username": body.username,
        "session": redact(&session_id),
        "expires_in": state.sessions.timeout_sec(),
    }))
    .into_response();
    Ok(transport.apply(response))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/logout
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn logout(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Response {
    let mut transport = cookie_transport(&state, &headers, peer);
    let revoked = state.sessions.logout(&mut transport);
    transport.apply(Json(json!({ "logged_out": revoked })).into_response())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /v1/session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Touch the caller's session and describe it.  Unknown, expired or
/// disabled-account sessions get a 401 and a cleared cookie.
pub async fn current_session(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Response {
    let mut transport = cookie_transport(&state, &headers, peer);
    let now = Utc::now();

    let Some(session_id) = transport.current_token() else {
        return ApiError::Unauthorized("not logged in".into()).into_response();
    };

    let touched = state
        .sessions
        .touch(&session_id, &transport.client_info(), now);
    let record = touched
        .then(|| state.sessions.lookup(&session_id))
        .flatten();

    let Some(record) = record else {
        transport.clear_token();
        return transport.apply(ApiError::Unauthorized("session expired".into()).into_response());
    };

    let disabled = state
        .users
        .find(record.username())
        .map_or(true, |u| u.disabled);
    if disabled {
        state.sessions.revoke(&session_id);
        transport.clear_token();
        return transport.apply(ApiError::Unauthorized("account disabled".into()).into_response());
    }

    Json(SessionView::from_record(&record, now)).into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Admin guard
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Axum middleware enforcing the admin bearer token.  Attach via
/// `axum::middleware::from_fn_with_state`.
///
/// With no token configured the admin surface is closed (403).
pub async fn require_admin_token(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected_hash) = &state.admin_token_hash else {
        return ApiError::Forbidden("admin endpoints disabled".into()).into_response();
    };

    let provided = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    // Hash to a fixed-length digest first so the comparison does not leak
    // the token length.
    let provided_hash = Sha256::digest(provided.as_bytes());

    if !bool::from(provided_hash.ct_eq(expected_hash.as_slice())) {
        return ApiError::Unauthorized("invalid admin token".into()).into_response();
    }

    next.run(req).await
}
