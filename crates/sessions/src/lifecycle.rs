//! Session lifecycle: issue on login, touch on access, revoke on logout,
//! and save/restore across process restarts.
//!
//! State per identifier: nonexistent → live (issue) → live (touch) →
//! revoked | expired → nonexistent.  Nothing returns to live once gone; a
//! client holding a stale id has to log in again.
//!
//! Composite operations here are not globally atomic.  Two simultaneous
//! logins on the same transport handle may both register; whichever the
//! client ends up holding is the live one.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};

use sk_domain::config::SessionsConfig;
use sk_domain::trace::TraceEvent;

use crate::codec;
use crate::expiry;
use crate::record::SessionRecord;
use crate::session_id::{self, redact};
use crate::store::SessionStore;
use crate::transport::{ClientInfo, TransportBinding};

/// Orchestrates the session store, expiry policy and durable codec.
#[derive(Debug)]
pub struct SessionLifecycleService {
    store: SessionStore,
    timeout_sec: u64,
    sweep_on_touch: bool,
    sweeping: AtomicBool,
}

impl SessionLifecycleService {
    pub fn new(timeout_sec: u64, sweep_on_touch: bool) -> Self {
        Self {
            store: SessionStore::new(),
            timeout_sec,
            sweep_on_touch,
            sweeping: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &SessionsConfig) -> Self {
        Self::new(config.timeout_sec, config.sweep_on_touch)
    }

    /// Inactivity timeout in seconds.
    pub fn timeout_sec(&self) -> u64 {
        self.timeout_sec
    }

    /// Read access to the underlying registry.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    // ── Login ───────────────────────────────────────────────────────

    /// Issue a new session for `username` on the given transport.
    ///
    /// Any session the transport already carries is revoked first, so a
    /// handle has at most one live record.  The new id is bound to the
    /// transport with a max-age equal to the inactivity timeout.
    pub fn issue(
        &self,
        username: &str,
        transport: &mut dyn TransportBinding,
        now: DateTime<Utc>,
    ) -> String {
        let replaced = transport
            .current_token()
            .and_then(|old| self.store.remove(&old))
            .map(|old| redact(old.session_id()));

        let mut session_id = session_id::generate(username, now);
        while self.store.contains(&session_id) {
            session_id = session_id::generate(username, now);
        }

        let client = transport.client_info();
        let remote_addr = client.remote_addr.clone();
        self.store
            .register(SessionRecord::new(session_id.clone(), username, now, client));
        transport.bind_token(&session_id, self.timeout_sec);

        TraceEvent::SessionIssued {
            username: username.to_owned(),
            session: redact(&session_id),
            replaced,
            remote_addr,
        }
        .emit();

        session_id
    }

    // ── Access ──────────────────────────────────────────────────────

    /// Record activity on `session_id`.
    ///
    /// Returns `false` when the id is unknown or turned out to be expired,
    /// in which case it is evicted rather than refreshed.
    pub fn touch(&self, session_id: &str, client: &ClientInfo, now: DateTime<Utc>) -> bool {
        if self.sweep_on_touch {
            self.sweep_expired(now);
        }

        if let Some(expired) = self
            .store
            .remove_if_expired(session_id, now, self.timeout_sec)
        {
            self.log_expired(&expired, now);
            return false;
        }

        match self.store.touch(session_id, now, client) {
            Some(record) => {
                TraceEvent::SessionTouched {
                    username: record.username().to_owned(),
                    session: redact(session_id),
                    remote_addr: record.remote_addr().to_owned(),
                }
                .emit();
                true
            }
            None => false,
        }
    }

    pub fn lookup(&self, session_id: &str) -> Option<SessionRecord> {
        self.store.get(session_id)
    }

    /// Resolve the record for the token the transport carries.
    pub fn lookup_current(&self, transport: &dyn TransportBinding) -> Option<SessionRecord> {
        transport
            .current_token()
            .and_then(|id| self.store.get(&id))
    }

    // ── Logout ──────────────────────────────────────────────────────

    /// Remove a session.  Returns whether one existed.  The follow-up
    /// lazy sweep runs against the wall clock; use [`Self::revoke_at`] to
    /// supply one.
    pub fn revoke(&self, session_id: &str) -> bool {
        self.revoke_at(session_id, Utc::now())
    }

    /// [`Self::revoke`] with an explicit clock for the follow-up sweep.
    pub fn revoke_at(&self, session_id: &str, now: DateTime<Utc>) -> bool {
        match self.store.remove(session_id) {
            Some(record) => {
                TraceEvent::SessionRevoked {
                    username: record.username().to_owned(),
                    session: redact(session_id),
                }
                .emit();
                if self.sweep_on_touch {
                    self.sweep_expired(now);
                }
                true
            }
            None => {
                tracing::error!(session = %redact(session_id), "session not found");
                false
            }
        }
    }

    /// Revoke the session the transport carries and clear its token.  The
    /// token is cleared even when no live session matched.
    pub fn logout(&self, transport: &mut dyn TransportBinding) -> bool {
        let revoked = match transport.current_token() {
            Some(id) => self.revoke(&id),
            None => false,
        };
        transport.clear_token();
        revoked
    }

    /// Revoke every session owned by `username`.  Returns how many went.
    pub fn revoke_all_for_user(&self, username: &str) -> usize {
        let removed = self.store.remove_all_by_user(username);
        TraceEvent::UserSessionsRevoked {
            username: username.to_owned(),
            count: removed.len(),
        }
        .emit();
        removed.len()
    }

    pub fn count_active_for_user(&self, username: &str) -> usize {
        self.store.count_by_user(username)
    }

    pub fn list_sessions(&self) -> Vec<SessionRecord> {
        self.store.snapshot()
    }

    // ── Expiry ──────────────────────────────────────────────────────

    /// Evict stale sessions.  If another sweep is already running this one
    /// is skipped and returns 0.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        if self
            .sweeping
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return 0;
        }
        let swept = self.sweep_unguarded(now);
        self.sweeping.store(false, Ordering::Release);
        swept
    }

    fn sweep_unguarded(&self, now: DateTime<Utc>) -> usize {
        let expired = self.store.sweep_expired(now, self.timeout_sec);
        for record in &expired {
            self.log_expired(record, now);
        }
        expired.len()
    }

    fn log_expired(&self, record: &SessionRecord, now: DateTime<Utc>) {
        TraceEvent::SessionExpired {
            username: record.username().to_owned(),
            session: redact(record.session_id()),
            idle_ms: expiry::idle_ms(record, now),
        }
        .emit();
    }

    // ── Durability ──────────────────────────────────────────────────

    /// Load the durable file into the store.  Called once at startup.
    /// Malformed lines are logged and skipped; a missing file restores
    /// nothing.  Returns the number of sessions restored.
    pub fn restore_from_durable_store(&self, path: &Path) -> usize {
        let decoded = match codec::load(path) {
            Ok(d) => d,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "session restore failed");
                return 0;
            }
        };

        for err in &decoded.malformed {
            tracing::error!(path = %path.display(), error = %err, "session restore error");
        }

        // Later lines win for a repeated id; count each id once.
        let mut ids = HashSet::new();
        for record in decoded.records {
            ids.insert(record.session_id().to_owned());
            self.store.register(record);
        }
        let restored = ids.len();

        TraceEvent::SessionsRestored {
            path: path.display().to_string(),
            restored,
            malformed: decoded.malformed.len(),
        }
        .emit();

        restored
    }

    /// Sweep, then overwrite the durable file with what is left.  Called
    /// once at graceful shutdown.  Failures are logged and reported as
    /// `None`; they never abort the caller.
    pub fn persist_to_durable_store(&self, path: &Path) -> Option<usize> {
        self.persist_at(path, Utc::now())
    }

    /// [`Self::persist_to_durable_store`] with an explicit clock.
    pub fn persist_at(&self, path: &Path, now: DateTime<Utc>) -> Option<usize> {
        let swept = self.sweep_unguarded(now);
        let records = self.store.snapshot();

        tracing::info!(path = %path.display(), "writing session info");
        match codec::save(path, &records) {
            Ok(written) => {
                TraceEvent::SessionsPersisted {
                    path: path.display().to_string(),
                    written,
                    swept,
                }
                .emit();
                Some(written)
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "session info save error");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[derive(Default)]
    struct FakeTransport {
        token: Option<String>,
        max_age: Option<u64>,
        cleared: bool,
    }

    impl TransportBinding for FakeTransport {
        fn current_token(&self) -> Option<String> {
            self.token.clone()
        }
        fn bind_token(&mut self, session_id: &str, max_age_secs: u64) {
            self.token = Some(session_id.to_owned());
            self.max_age = Some(max_age_secs);
        }
        fn clear_token(&mut self) {
            self.token = None;
            self.cleared = true;
        }
        fn client_info(&self) -> ClientInfo {
            ClientInfo::new("192.0.2.1", "client.example", "test-agent")
        }
    }

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn issue_binds_token_with_timeout_max_age() {
        let svc = SessionLifecycleService::new(1800, true);
        let mut t = FakeTransport::default();
        let id = svc.issue("alice", &mut t, Utc::now());

        assert_eq!(t.token.as_deref(), Some(id.as_str()));
        assert_eq!(t.max_age, Some(1800));
        let rec = svc.lookup(&id).unwrap();
        assert_eq!(rec.username(), "alice");
        assert_eq!(rec.remote_addr(), "192.0.2.1");
        assert_eq!(rec.created_at(), rec.last_accessed_at());
    }

    #[test]
    fn relogin_on_same_handle_revokes_previous() {
        let svc = SessionLifecycleService::new(1800, true);
        let mut t = FakeTransport::default();
        let first = svc.issue("alice", &mut t, Utc::now());
        let second = svc.issue("alice", &mut t, Utc::now());

        assert_ne!(first, second);
        assert!(svc.lookup(&first).is_none());
        assert!(svc.lookup(&second).is_some());
        assert_eq!(svc.count_active_for_user("alice"), 1);
    }

    #[test]
    fn concrete_expiry_scenario() {
        let svc = SessionLifecycleService::new(1, true);
        let mut t = FakeTransport::default();
        let h = svc.issue("alice", &mut t, at(1000));

        assert!(svc.touch(&h, &t.client_info(), at(1500)));
        assert_eq!(svc.lookup(&h).unwrap().last_accessed_at(), at(1500));

        assert_eq!(svc.sweep_expired(at(2600)), 1);
        assert!(svc.lookup(&h).is_none());
    }

    #[test]
    fn touch_never_revives_an_expired_session() {
        let svc = SessionLifecycleService::new(10, false);
        let mut t = FakeTransport::default();
        let id = svc.issue("alice", &mut t, Utc::now() - Duration::seconds(11));

        assert!(!svc.touch(&id, &t.client_info(), Utc::now()));
        assert!(svc.lookup(&id).is_none());
    }

    #[test]
    fn touch_unknown_is_noop() {
        let svc = SessionLifecycleService::new(10, true);
        assert!(!svc.touch("nope", &ClientInfo::default(), Utc::now()));
    }

    #[test]
    fn touch_with_earlier_clock_keeps_last_accessed() {
        let svc = SessionLifecycleService::new(60, true);
        let mut t = FakeTransport::default();
        let id = svc.issue("alice", &mut t, at(5000));
        assert!(svc.touch(&id, &t.client_info(), at(4000)));
        assert_eq!(svc.lookup(&id).unwrap().last_accessed_at(), at(5000));
    }

    #[test]
    fn revoke_twice_returns_false() {
        let svc = SessionLifecycleService::new(60, true);
        let mut t = FakeTransport::default();
        let id = svc.issue("alice", &mut t, Utc::now());
        assert!(svc.revoke(&id));
        assert!(!svc.revoke(&id));
    }

    #[test]
    fn revoke_sweeps_with_the_supplied_clock() {
        let svc = SessionLifecycleService::new(10, true);
        let a = svc.issue("alice", &mut FakeTransport::default(), at(1000));
        let b = svc.issue("bob", &mut FakeTransport::default(), at(1000));

        assert!(svc.revoke_at(&a, at(2000)));
        assert!(svc.lookup(&b).is_some());

        assert!(!svc.revoke_at(&a, at(20_000)));
        assert!(svc.lookup(&b).is_some());
        assert!(svc.revoke_at(&b, at(20_000)));
    }

    #[test]
    fn logout_clears_token_even_if_unknown() {
        let svc = SessionLifecycleService::new(60, true);
        let mut t = FakeTransport {
            token: Some("stale".into()),
            ..Default::default()
        };
        assert!(!svc.logout(&mut t));
        assert!(t.cleared);
        assert!(t.token.is_none());
    }

    #[test]
    fn revoke_all_for_user_leaves_others() {
        let svc = SessionLifecycleService::new(60, true);
        let now = Utc::now();
        svc.issue("alice", &mut FakeTransport::default(), now);
        svc.issue("alice", &mut FakeTransport::default(), now);
        svc.issue("bob", &mut FakeTransport::default(), now);

        assert_eq!(svc.count_active_for_user("alice"), 2);
        assert_eq!(svc.revoke_all_for_user("alice"), 2);
        assert_eq!(svc.count_active_for_user("alice"), 0);
        assert_eq!(svc.count_active_for_user("bob"), 1);
    }

    #[test]
    fn concurrent_sweep_is_skipped() {
        let svc = SessionLifecycleService::new(1, true);
        svc.store().register(SessionRecord::new(
            "old",
            "alice",
            at(0),
            ClientInfo::default(),
        ));
        svc.sweeping.store(true, Ordering::SeqCst);
        assert_eq!(svc.sweep_expired(at(10_000)), 0);
        assert!(svc.lookup("old").is_some());

        svc.sweeping.store(false, Ordering::SeqCst);
        assert_eq!(svc.sweep_expired(at(10_000)), 1);
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn logged_events_never_carry_full_ids() {
        let sink = Captured::default();
        let writer = sink.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.txt");
        let (kept, revoked, expired) = tracing::subscriber::with_default(subscriber, || {
            let svc = SessionLifecycleService::new(60, true);
            let mut t = FakeTransport::default();
            let kept = svc.issue("alice", &mut t, at(1_000));
            assert!(svc.touch(&kept, &t.client_info(), at(2_000)));

            let revoked = svc.issue("bob", &mut FakeTransport::default(), at(2_000));
            assert!(svc.revoke_at(&revoked, at(2_000)));
            assert!(!svc.revoke_at(&revoked, at(2_000)));

            let expired = svc.issue("carol", &mut FakeTransport::default(), at(0));
            assert!(!svc.touch(&expired, &ClientInfo::default(), at(61_001)));

            svc.persist_at(&path, at(2_000));
            svc.restore_from_durable_store(&path);
            (kept, revoked, expired)
        });

        let logs = String::from_utf8(sink.0.lock().clone()).unwrap();
        for event in ["SessionIssued", "SessionTouched", "SessionRevoked", "SessionExpired"] {
            assert!(logs.contains(event), "missing {event} in:\n{logs}");
        }
        for id in [&kept, &revoked, &expired] {
            assert!(!logs.contains(id.as_str()), "full id leaked in:\n{logs}");
            assert!(logs.contains(&redact(id)));
        }
    }
}
