//! Concurrent session registry.
//!
//! Maps session id → [`SessionRecord`] in a sharded [`DashMap`], so point
//! operations only contend with keys in the same shard and full scans never
//! take a global lock.  Every mutation of a record goes through this type.
//!
//! Scans (`count_by_user`, `remove_all_by_user`, `sweep_expired`) have
//! snapshot semantics: matching ids are collected first, then each is
//! removed with a conditional `remove_if` that re-checks the predicate, so a
//! record touched between the scan and the removal survives.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::expiry;
use crate::record::SessionRecord;
use crate::transport::ClientInfo;

/// The single owner of all session records.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, SessionRecord>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `record.session_id()`.  Last write wins.
    pub fn register(&self, record: SessionRecord) {
        self.sessions
            .insert(record.session_id().to_owned(), record);
    }

    /// Look up a record by id.
    pub fn get(&self, session_id: &str) -> Option<SessionRecord> {
        self.sessions.get(session_id).map(|r| r.value().clone())
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Atomically remove and return a record.
    pub fn remove(&self, session_id: &str) -> Option<SessionRecord> {
        self.sessions.remove(session_id).map(|(_, r)| r)
    }

    /// Remove the record only if it is stale at `now`.
    pub fn remove_if_expired(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
        timeout_sec: u64,
    ) -> Option<SessionRecord> {
        self.sessions
            .remove_if(session_id, |_, r| expiry::is_expired(r, now, timeout_sec))
            .map(|(_, r)| r)
    }

    /// Apply the touch mutation in place.  Returns the updated record, or
    /// `None` if the id is unknown.
    pub fn touch(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
        client: &ClientInfo,
    ) -> Option<SessionRecord> {
        let mut entry = self.sessions.get_mut(session_id)?;
        entry.touch(now, client);
        Some(entry.clone())
    }

    /// Number of records owned by `username`.
    pub fn count_by_user(&self, username: &str) -> usize {
        self.sessions
            .iter()
            .filter(|e| e.value().username() == username)
            .count()
    }

    /// Remove every record owned by `username` and return them.
    pub fn remove_all_by_user(&self, username: &str) -> Vec<SessionRecord> {
        let ids = self.collect_ids(|r| r.username() == username);
        ids.into_iter()
            .filter_map(|id| {
                self.sessions
                    .remove_if(&id, |_, r| r.username() == username)
                    .map(|(_, r)| r)
            })
            .collect()
    }

    /// Evict every record idle for longer than `timeout_sec` at `now` and
    /// return the evicted records.
    pub fn sweep_expired(&self, now: DateTime<Utc>, timeout_sec: u64) -> Vec<SessionRecord> {
        let ids = self.collect_ids(|r| expiry::is_expired(r, now, timeout_sec));
        ids.into_iter()
            .filter_map(|id| self.remove_if_expired(&id, now, timeout_sec))
            .collect()
    }

    /// Clones of all records, in map iteration order.
    pub fn snapshot(&self) -> Vec<SessionRecord> {
        self.sessions.iter().map(|e| e.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    // The iterator's shard guards are dropped before the caller removes
    // anything; removing while iterating the same shard deadlocks.
    fn collect_ids(&self, pred: impl Fn(&SessionRecord) -> bool) -> Vec<String> {
        self.sessions
            .iter()
            .filter(|e| pred(e.value()))
            .map(|e| e.key().clone())
            .collect()
    }
}
