//! Line-oriented durable format for the session registry.
//!
//! One record per line, seven tab-separated fields, no header:
//!
//! ```text
//! sessionId \t username \t createdAt \t lastAccessedAt \t remoteAddr \t remoteHost \t userAgent \n
//! ```
//!
//! Timestamps are Unix epoch milliseconds.  Tabs and line breaks inside
//! field values are replaced by a space on encode, so a record always stays
//! on a single line.  On decode a bad line is reported and skipped without
//! affecting the others.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};

use sk_domain::error::{Error, Result};

use crate::record::SessionRecord;
use crate::transport::ClientInfo;

/// Number of fields on every line.
pub const FIELD_COUNT: usize = 7;

const FIELD_NAMES: [&str; FIELD_COUNT] = [
    "sessionId",
    "username",
    "createdAt",
    "lastAccessedAt",
    "remoteAddr",
    "remoteHost",
    "userAgent",
];

/// Why a single line failed to decode.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("{field} is not a valid millisecond timestamp: {value:?}")]
    Timestamp { field: &'static str, value: String },

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("lastAccessedAt precedes createdAt")]
    TimeOrder,
}

/// Result of decoding a whole file.
#[derive(Debug, Default)]
pub struct Decoded {
    pub records: Vec<SessionRecord>,
    /// One [`Error::MalformedRecord`] per skipped line.
    pub malformed: Vec<Error>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Encode
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Encode records, one line each, in iteration order.
pub fn encode<'a>(records: impl IntoIterator<Item = &'a SessionRecord>) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&encode_line(record));
        out.push('\n');
    }
    out
}

/// Encode a single record without the trailing newline.
pub fn encode_line(record: &SessionRecord) -> String {
    let created = record.created_at().timestamp_millis().to_string();
    let last = record.last_accessed_at().timestamp_millis().to_string();
    let fields = [
        record.session_id(),
        record.username(),
        &created,
        &last,
        record.remote_addr(),
        record.remote_host(),
        record.user_agent(),
    ];
    fields
        .iter()
        .map(|f| sanitize(f))
        .collect::<Vec<_>>()
        .join("\t")
}

fn sanitize(value: &str) -> String {
    value.replace(['\t', '\r', '\n'], " ")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Decode
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Decode a single line (without its newline).
pub fn decode_line(line: &str) -> std::result::Result<SessionRecord, CodecError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != FIELD_COUNT {
        return Err(CodecError::FieldCount {
            expected: FIELD_COUNT,
            found: fields.len(),
        });
    }

    if fields[0].is_empty() {
        return Err(CodecError::EmptyField(FIELD_NAMES[0]));
    }
    if fields[1].is_empty() {
        return Err(CodecError::EmptyField(FIELD_NAMES[1]));
    }

    let created_at = parse_millis(FIELD_NAMES[2], fields[2])?;
    let last_accessed_at = parse_millis(FIELD_NAMES[3], fields[3])?;

    SessionRecord::restore(
        fields[0].to_owned(),
        fields[1].to_owned(),
        created_at,
        last_accessed_at,
        ClientInfo::new(fields[4], fields[5], fields[6]),
    )
    .ok_or(CodecError::TimeOrder)
}

fn parse_millis(
    field: &'static str,
    value: &str,
) -> std::result::Result<DateTime<Utc>, CodecError> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .ok_or_else(|| CodecError::Timestamp {
            field,
            value: value.to_owned(),
        })
}

/// Decode a whole file body.  Blank lines are ignored; malformed lines are
/// collected in [`Decoded::malformed`] (1-based line numbers).
pub fn decode(input: &str) -> Decoded {
    let mut decoded = Decoded::default();
    for (idx, line) in input.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match decode_line(line) {
            Ok(record) => decoded.records.push(record),
            Err(e) => decoded.malformed.push(Error::MalformedRecord {
                line: idx + 1,
                reason: e.to_string(),
            }),
        }
    }
    decoded
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// File I/O
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Read and decode the durable file.  A missing file decodes to nothing.
/// Invalid UTF-8 is replaced rather than failing the whole load.
pub fn load(path: &Path) -> Result<Decoded> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Decoded::default()),
        Err(e) => return Err(Error::Io(e)),
    };
    Ok(decode(&String::from_utf8_lossy(&bytes)))
}

/// Overwrite the durable file with `records`.  Writes to a sibling `.tmp`
/// file and renames it into place.  Returns the number of records written.
pub fn save(path: &Path, records: &[SessionRecord]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let body = encode(records);
    let tmp = path.with_extension("tmp");
    let written = (|| -> std::io::Result<()> {
        let mut f = std::fs::File::create(&tmp)?;
        f.write_all(body.as_bytes())?;
        f.sync_all()?;
        std::fs::rename(&tmp, path)
    })();

    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp);
        return Err(Error::Io(e));
    }
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, user: &str, created: i64, last: i64, ua: &str) -> SessionRecord {
        SessionRecord::restore(
            id.into(),
            user.into(),
            DateTime::<Utc>::from_timestamp_millis(created).unwrap(),
            DateTime::<Utc>::from_timestamp_millis(last).unwrap(),
            ClientInfo::new("192.0.2.1", "host.example", ua),
        )
        .unwrap()
    }

    #[test]
    fn encodes_seven_fields_in_order() {
        let line = encode_line(&rec("H", "alice", 1000, 1500, "curl/8"));
        assert_eq!(line, "H\talice\t1000\t1500\t192.0.2.1\thost.example\tcurl/8");
    }

    #[test]
    fn encode_then_decode_preserves_all_fields() {
        let records = vec![
            rec("a", "alice", 1000, 1500, "ua-a"),
            rec("b", "bob", 2000, 2000, ""),
        ];
        let decoded = decode(&encode(&records));
        assert!(decoded.malformed.is_empty());
        assert_eq!(decoded.records, records);
    }

    #[test]
    fn live_records_decode_unchanged() {
        let mut live = SessionRecord::new(
            "c",
            "carol",
            Utc::now(),
            ClientInfo::new("192.0.2.5", "host.example", "curl/8"),
        );
        live.touch(
            Utc::now() + chrono::Duration::nanoseconds(1_234_567),
            &ClientInfo::new("192.0.2.6", "host.example", "curl/8"),
        );
        let records = vec![live];

        let decoded = decode(&encode(&records));
        assert_eq!(decoded.records, records);
    }

    #[test]
    fn tabs_and_newlines_in_values_are_flattened() {
        let r = rec("a", "alice", 1000, 1500, "evil\tagent\nnext");
        let body = encode([&r]);
        assert_eq!(body.lines().count(), 1);

        let decoded = decode(&body);
        assert_eq!(decoded.records.len(), 1);
        assert_eq!(decoded.records[0].user_agent(), "evil agent next");
    }

    #[test]
    fn malformed_line_is_skipped_not_fatal() {
        let good = encode(&[
            rec("a", "alice", 1000, 1500, "x"),
            rec("b", "bob", 1000, 1500, "y"),
        ]);
        let body = format!("{good}garbage line\n");
        let decoded = decode(&body);
        assert_eq!(decoded.records.len(), 2);
        assert_eq!(decoded.malformed.len(), 1);
        assert!(matches!(
            decoded.malformed[0],
            Error::MalformedRecord { line: 3, .. }
        ));
    }

    #[test]
    fn non_numeric_timestamp_rejected() {
        let err = decode_line("a\talice\tnope\t1500\t\t\t").unwrap_err();
        assert_eq!(
            err,
            CodecError::Timestamp {
                field: "createdAt",
                value: "nope".into()
            }
        );
    }

    #[test]
    fn wrong_field_count_rejected() {
        let err = decode_line("a\talice\t1000\t1500").unwrap_err();
        assert_eq!(err, CodecError::FieldCount { expected: 7, found: 4 });
    }

    #[test]
    fn inverted_timestamps_rejected() {
        let err = decode_line("a\talice\t2000\t1000\t\t\t").unwrap_err();
        assert_eq!(err, CodecError::TimeOrder);
    }

    #[test]
    fn empty_descriptor_fields_are_fine() {
        let r = decode_line("a\talice\t1000\t1000\t\t\t").unwrap();
        assert_eq!(r.remote_addr(), "");
        assert_eq!(r.user_agent(), "");
    }

    #[test]
    fn blank_lines_and_crlf_tolerated() {
        let body = "a\talice\t1000\t1000\tx\ty\tz\r\n\r\n";
        let decoded = decode(body);
        assert_eq!(decoded.records.len(), 1);
        assert!(decoded.malformed.is_empty());
        assert_eq!(decoded.records[0].user_agent(), "z");
    }

    #[test]
    fn save_and_load_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sessions.txt");
        let records = vec![rec("a", "alice", 1000, 1500, "ua")];

        assert_eq!(save(&path, &records).unwrap(), 1);
        assert!(!path.with_extension("tmp").exists());

        let decoded = load(&path).unwrap();
        assert_eq!(decoded.records, records);
    }

    #[test]
    fn save_overwrites_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.txt");
        save(&path, &[rec("a", "alice", 1000, 1500, "ua"), rec("b", "bob", 1, 2, "")]).unwrap();
        save(&path, &[rec("c", "carol", 5, 6, "")]).unwrap();

        let decoded = load(&path).unwrap();
        assert_eq!(decoded.records.len(), 1);
        assert_eq!(decoded.records[0].session_id(), "c");
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let decoded = load(&dir.path().join("absent.txt")).unwrap();
        assert!(decoded.records.is_empty());
        assert!(decoded.malformed.is_empty());
    }
}
