//! Column encoding shared by the repositories.
//!
//! Identifiers are stored as hyphenated text and timestamps as RFC 3339
//! text with nanosecond precision, so both sort and compare as strings.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::domain::{DomainError, DomainResult};

pub(super) fn encode_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(super) fn decode_time(raw: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DomainError::Internal(format!("Bad timestamp {:?}: {}", raw, e)))
}

pub(super) fn decode_id(raw: &str) -> DomainResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| DomainError::Internal(format!("Bad id {:?}: {}", raw, e)))
}

/// Read a text column and decode it
pub(super) fn id_at(row: &rusqlite::Row, index: usize) -> DomainResult<Uuid> {
    let raw: String = row.get(index)?;
    decode_id(&raw)
}

pub(super) fn time_at(row: &rusqlite::Row, index: usize) -> DomainResult<DateTime<Utc>> {
    let raw: String = row.get(index)?;
    decode_time(&raw)
}

pub(super) fn optional_time_at(
    row: &rusqlite::Row,
    index: usize,
) -> DomainResult<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(index)?;
    raw.as_deref().map(decode_time).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_keeps_nanoseconds() {
        let now = Utc::now();
        let encoded = encode_time(&now);
        assert!(encoded.ends_with('Z'));
        assert_eq!(decode_time(&encoded).unwrap(), now);
    }

    #[test]
    fn test_bad_values_are_internal_errors() {
        assert!(matches!(decode_time("yesterday"), Err(DomainError::Internal(_))));
        assert!(matches!(decode_id("42"), Err(DomainError::Internal(_))));
    }
}
