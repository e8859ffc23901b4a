//! Cookie-backed [`TransportBinding`].
//!
//! Built from the request headers and peer address, handed to the
//! lifecycle service, then applied to the response so any token change
//! becomes a `Set-Cookie` header.

use std::net::SocketAddr;

use axum::http::header::{COOKIE, SET_COOKIE, USER_AGENT};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;

use sk_sessions::{ClientInfo, TransportBinding};

pub struct CookieTransport {
    cookie_name: String,
    token: Option<String>,
    client: ClientInfo,
    set_cookie: Option<String>,
}

impl CookieTransport {
    /// `remote_addr` is the socket peer.  `remote_host` prefers the first
    /// `X-Forwarded-For` hop when a proxy supplied one.
    pub fn from_request(cookie_name: &str, headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let remote_addr = peer.map(|p| p.ip().to_string()).unwrap_or_default();
        let remote_host = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| remote_addr.clone());
        let user_agent = headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_owned();

        Self {
            cookie_name: cookie_name.to_owned(),
            token: read_cookie(headers, cookie_name),
            client: ClientInfo {
                remote_addr,
                remote_host,
                user_agent,
            },
            set_cookie: None,
        }
    }

    /// Attach the pending `Set-Cookie` header, if any.
    pub fn apply(self, mut response: Response) -> Response {
        if let Some(cookie) = self.set_cookie {
            match HeaderValue::from_str(&cookie) {
                Ok(v) => {
                    response.headers_mut().append(SET_COOKIE, v);
                }
                Err(e) => tracing::warn!(error = %e, "unencodable session cookie"),
            }
        }
        response
    }
}

impl TransportBinding for CookieTransport {
    fn current_token(&self) -> Option<String> {
        self.token.clone()
    }

    fn bind_token(&mut self, session_id: &str, max_age_secs: u64) {
        self.token = Some(session_id.to_owned());
        self.set_cookie = Some(format!(
            "{}={session_id}; Max-Age={max_age_secs}; Path=/; HttpOnly; SameSite=Lax",
            self.cookie_name
        ));
    }

    fn clear_token(&mut self) {
        self.token = None;
        self.set_cookie = Some(format!(
            "{}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax",
            self.cookie_name
        ));
    }

    fn client_info(&self) -> ClientInfo {
        self.client.clone()
    }
}

/// Find `name` across all `Cookie` headers.  Empty values count as absent.
fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
