use serde::Serialize;

/// Structured trace events emitted across all SessionKeeper crates.
///
/// Session identifiers carried here are always redacted by the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionIssued {
        username: String,
        session: String,
        replaced: Option<String>,
        remote_addr: String,
    },
    /// Emitted at debug level; touches happen on every request.
    SessionTouched {
        username: String,
        session: String,
        remote_addr: String,
    },
    SessionRevoked {
        username: String,
        session: String,
    },
    SessionExpired {
        username: String,
        session: String,
        idle_ms: i64,
    },
    UserSessionsRevoked {
        username: String,
        count: usize,
    },
    SessionsRestored {
        path: String,
        restored: usize,
        malformed: usize,
    },
    SessionsPersisted {
        path: String,
        written: usize,
        swept: usize,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        match self {
            TraceEvent::SessionTouched { .. } => tracing::debug!(trace_event = %json, "sk_event"),
            _ => tracing::info!(trace_event = %json, "sk_event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag() {
        let ev = TraceEvent::SessionRevoked {
            username: "alice".into(),
            session: "abcd…wxyz".into(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "SessionRevoked");
        assert_eq!(json["username"], "alice");
    }
}
