//! The transport-binding capability.
//!
//! The lifecycle service never touches cookies or headers.  Whatever carries
//! the session token (an HTTP cookie jar, a test double) implements
//! [`TransportBinding`] for the duration of one request.

/// Best-effort client descriptors observed on a request.  Not authenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub remote_addr: String,
    pub remote_host: String,
    pub user_agent: String,
}

impl ClientInfo {
    pub fn new(
        remote_addr: impl Into<String>,
        remote_host: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            remote_addr: remote_addr.into(),
            remote_host: remote_host.into(),
            user_agent: user_agent.into(),
        }
    }
}

/// Per-request view of the transport-level session handle.
pub trait TransportBinding {
    /// The session token presented by the client, if any.
    fn current_token(&self) -> Option<String>;

    /// Bind `session_id` as the client's token for `max_age_secs`.
    fn bind_token(&mut self, session_id: &str, max_age_secs: u64);

    /// Tell the client to drop its token.
    fn clear_token(&mut self);

    /// Descriptors of the calling client.
    fn client_info(&self) -> ClientInfo;
}
