//! Session identifier generation and log redaction.
//!
//! An identifier is the hex SHA-256 of the issuance time, the principal and
//! 32 bytes from the OS random source.  The digest reveals neither the seed
//! nor the timestamp.

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Length of a generated identifier in characters.
pub const SESSION_ID_LEN: usize = 64;

const VISIBLE: usize = 4;

/// Mint a new unpredictable identifier for `username`.
pub fn generate(username: &str, now: DateTime<Utc>) -> String {
    let mut nonce = [0u8; 32];
    OsRng.fill_bytes(&mut nonce);

    let nanos = now
        .timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_millis());

    let mut hasher = Sha256::new();
    hasher.update(nanos.to_be_bytes());
    hasher.update(username.as_bytes());
    hasher.update(nonce);
    hex::encode(hasher.finalize())
}

/// Mask an identifier for logging: `abcd…wxyz`.  Short or empty values are
/// fully masked.
pub fn redact(session_id: &str) -> String {
    let chars: Vec<char> = session_id.chars().collect();
    if chars.len() <= VISIBLE * 2 {
        return "****".into();
    }
    let head: String = chars[..VISIBLE].iter().collect();
    let tail: String = chars[chars.len() - VISIBLE..].iter().collect();
    format!("{head}…{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_hex_of_fixed_length() {
        let id = generate("alice", Utc::now());
        assert_eq!(id.len(), SESSION_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn same_user_same_instant_still_unique() {
        let now = Utc::now();
        let ids: HashSet<String> = (0..1000).map(|_| generate("alice", now)).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn id_does_not_contain_username_or_time() {
        let now = Utc::now();
        let id = generate("alice", now);
        assert!(!id.contains("alice"));
        assert!(!id.contains(&now.timestamp_millis().to_string()));
    }

    #[test]
    fn redact_keeps_prefix_and_suffix() {
        assert_eq!(redact("0123456789abcdef"), "0123…cdef");
    }

    #[test]
    fn redact_masks_short_values() {
        assert_eq!(redact(""), "****");
        assert_eq!(redact("12345678"), "****");
    }

    #[test]
    fn redact_is_char_boundary_safe() {
        assert_eq!(redact("ééééééééé"), "éééé…éééé");
    }
}
