//! `sessionkeeper sessions inspect`: read the durable file without
//! starting the server.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};

use sk_sessions::{codec, expiry, redact, SessionRecord};

/// Decode `path` and print a redacted table plus a malformed-line summary.
pub fn run(path: &Path, timeout_sec: u64) -> anyhow::Result<()> {
    let decoded = codec::load(path)
        .map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))?;

    print!("{}", render(&decoded.records, Utc::now(), timeout_sec));

    for err in &decoded.malformed {
        eprintln!("skipped: {err}");
    }
    println!(
        "\n{} record(s), {} malformed line(s) in {}",
        decoded.records.len(),
        decoded.malformed.len(),
        path.display()
    );
    Ok(())
}

fn render(records: &[SessionRecord], now: DateTime<Utc>, timeout_sec: u64) -> String {
    let mut out = format!(
        "{:<12} {:<16} {:<20} {:>8} {:<7} {}\n",
        "SESSION", "USER", "LAST ACCESS", "IDLE(s)", "STATE", "REMOTE"
    );
    for r in records {
        let state = if expiry::is_expired(r, now, timeout_sec) {
            "expired"
        } else {
            "active"
        };
        out.push_str(&format!(
            "{:<12} {:<16} {:<20} {:>8} {:<7} {}\n",
            redact(r.session_id()),
            r.username(),
            r.last_accessed_at().to_rfc3339_opts(SecondsFormat::Secs, true),
            expiry::idle_ms(r, now).max(0) / 1000,
            state,
            r.remote_addr(),
        ));
    }
    out
}
