//! One logged-in session.
//!
//! Identity (`session_id`, `username`, `created_at`) is fixed at issuance.
//! Activity metadata is only mutated through the store's touch path, which
//! is why the setters are crate-private.
//!
//! Timestamps are held at millisecond precision, the resolution of the
//! durable file.

use chrono::{DateTime, SubsecRound, Utc};

use crate::transport::ClientInfo;

/// Server-side state for one authenticated client lineage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    session_id: String,
    username: String,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
    remote_addr: String,
    remote_host: String,
    user_agent: String,
}

impl SessionRecord {
    /// A fresh record: `created_at == last_accessed_at == now`.
    pub fn new(
        session_id: impl Into<String>,
        username: impl Into<String>,
        now: DateTime<Utc>,
        client: ClientInfo,
    ) -> Self {
        let now = now.trunc_subsecs(3);
        Self {
            session_id: session_id.into(),
            username: username.into(),
            created_at: now,
            last_accessed_at: now,
            remote_addr: client.remote_addr,
            remote_host: client.remote_host,
            user_agent: client.user_agent,
        }
    }

    /// Rebuild a record from persisted fields.  Returns `None` when the
    /// timestamps are out of order.
    pub fn restore(
        session_id: String,
        username: String,
        created_at: DateTime<Utc>,
        last_accessed_at: DateTime<Utc>,
        client: ClientInfo,
    ) -> Option<Self> {
        if last_accessed_at < created_at {
            return None;
        }
        Some(Self {
            session_id,
            username,
            created_at,
            last_accessed_at,
            remote_addr: client.remote_addr,
            remote_host: client.remote_host,
            user_agent: client.user_agent,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_accessed_at(&self) -> DateTime<Utc> {
        self.last_accessed_at
    }

    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    pub fn remote_host(&self) -> &str {
        &self.remote_host
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Last-observed client descriptors as one value.
    pub fn client_info(&self) -> ClientInfo {
        ClientInfo {
            remote_addr: self.remote_addr.clone(),
            remote_host: self.remote_host.clone(),
            user_agent: self.user_agent.clone(),
        }
    }

    /// Advance `last_accessed_at`.  Earlier timestamps are ignored so the
    /// value never moves backwards.
    pub(crate) fn update_last_accessed(&mut self, now: DateTime<Utc>) {
        let now = now.trunc_subsecs(3);
        if now > self.last_accessed_at {
            self.last_accessed_at = now;
        }
    }

    pub(crate) fn set_remote_addr(&mut self, addr: String) {
        self.remote_addr = addr;
    }

    pub(crate) fn set_remote_host(&mut self, host: String) {
        self.remote_host = host;
    }

    pub(crate) fn set_user_agent(&mut self, ua: String) {
        self.user_agent = ua;
    }

    /// Touch mutation: refresh activity time and overwrite the descriptors.
    pub(crate) fn touch(&mut self, now: DateTime<Utc>, client: &ClientInfo) {
        self.update_last_accessed(now);
        self.set_remote_addr(client.remote_addr.clone());
        self.set_remote_host(client.remote_host.clone());
        self.set_user_agent(client.user_agent.clone());
    }
}
