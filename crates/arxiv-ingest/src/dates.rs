//! Date normalization for the ingest stage
//!
//! Version creation dates arrive as RFC 2822 strings
//! ("Mon, 2 Apr 2007 19:18:42 GMT") and are rewritten to ISO 8601 so the
//! search index can map them as dates.

use crate::record::{CleanedRecord, VersionEntry};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Wire name of the injected ingest timestamp
pub const INGEST_TIMESTAMP_FIELD: &str = "__ingest_timestamp";

/// A cleaned record ready for the search index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexRecord {
    #[serde(flatten)]
    pub record: CleanedRecord,

    /// Serialized as [`INGEST_TIMESTAMP_FIELD`]; keep the two in sync
    #[serde(rename = "__ingest_timestamp")]
    pub ingest_timestamp: String,
}

impl IndexRecord {
    /// Document key, if the record has a non-empty id
    pub fn id(&self) -> Option<&str> {
        self.record.id.as_deref().filter(|id| !id.is_empty())
    }
}

/// A `created` value that could not be parsed; the entry is left as it was
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWarning {
    pub version: Option<String>,
    pub value: String,
    pub reason: String,
}

/// Convert an RFC 2822 date string to ISO 8601
pub fn rfc2822_to_iso8601(value: &str) -> Result<String, chrono::ParseError> {
    DateTime::parse_from_rfc2822(value.trim()).map(|dt| dt.to_rfc3339())
}

/// Rewrite every string `created` field in place
///
/// Non-string values are left alone. Unparseable strings are left alone too
/// and reported in the returned warnings.
pub fn normalize_version_dates(versions: &mut [VersionEntry]) -> Vec<DateWarning> {
    let mut warnings = Vec::new();

    for entry in versions.iter_mut() {
        let Some(Value::String(created)) = entry.created.as_mut() else {
            continue;
        };

        match rfc2822_to_iso8601(created) {
            Ok(iso) => *created = iso,
            Err(e) => {
                warn!(
                    version = entry.version.as_deref().unwrap_or("?"),
                    created = %created,
                    error = %e,
                    "Failed to parse created date in versions"
                );
                warnings.push(DateWarning {
                    version: entry.version.clone(),
                    value: created.clone(),
                    reason: e.to_string(),
                });
            },
        }
    }

    warnings
}

/// Stamp a record with its ingest time and normalize its version dates
pub fn to_index_record(
    mut record: CleanedRecord,
    ingested_at: DateTime<Utc>,
) -> (IndexRecord, Vec<DateWarning>) {
    let warnings = normalize_version_dates(&mut record.versions);
    let indexed = IndexRecord {
        record,
        ingest_timestamp: ingested_at.to_rfc3339(),
    };
    (indexed, warnings)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn entry(version: &str, created: Value) -> VersionEntry {
        VersionEntry {
            version: Some(version.to_string()),
            created: Some(created),
            ..Default::default()
        }
    }

    #[test]
    fn test_rfc2822_to_iso8601() {
        assert_eq!(
            rfc2822_to_iso8601("Mon, 2 Jan 2023 10:00:00 GMT").unwrap(),
            "2023-01-02T10:00:00+00:00"
        );
        assert_eq!(
            rfc2822_to_iso8601("Mon, 2 Apr 2007 19:18:42 -0500").unwrap(),
            "2007-04-02T19:18:42-05:00"
        );
        assert!(rfc2822_to_iso8601("2nd of January").is_err());
    }

    #[test]
    fn test_string_dates_are_rewritten() {
        let mut versions = vec![
            entry("v1", json!("Mon, 2 Jan 2023 10:00:00 GMT")),
            entry("v2", json!("Tue, 24 Jul 2007 20:10:27 GMT")),
        ];
        let warnings = normalize_version_dates(&mut versions);

        assert!(warnings.is_empty());
        assert_eq!(versions[0].created, Some(json!("2023-01-02T10:00:00+00:00")));
        assert_eq!(versions[1].created, Some(json!("2007-07-24T20:10:27+00:00")));
    }

    #[test]
    fn test_malformed_date_left_untouched_with_warning() {
        let mut versions = vec![
            entry("v1", json!("yesterday")),
            entry("v2", json!("Mon, 2 Jan 2023 10:00:00 GMT")),
        ];
        let warnings = normalize_version_dates(&mut versions);

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].version.as_deref(), Some("v1"));
        assert_eq!(warnings[0].value, "yesterday");
        assert_eq!(versions[0].created, Some(json!("yesterday")));
        assert_eq!(versions[1].created, Some(json!("2023-01-02T10:00:00+00:00")));
    }

    #[test]
    fn test_non_string_dates_left_alone() {
        let structured = json!({"seconds": 1_672_653_600});
        let mut versions = vec![
            entry("v1", structured.clone()),
            VersionEntry {
                version: Some("v2".to_string()),
                ..Default::default()
            },
        ];
        let warnings = normalize_version_dates(&mut versions);

        assert!(warnings.is_empty());
        assert_eq!(versions[0].created, Some(structured));
        assert_eq!(versions[1].created, None);
    }

    #[test]
    fn test_ingest_timestamp_injected_without_versions() {
        let ingested_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let (indexed, warnings) = to_index_record(CleanedRecord::default(), ingested_at);

        assert!(warnings.is_empty());
        assert_eq!(indexed.ingest_timestamp, "2024-05-01T12:30:00+00:00");

        let doc = serde_json::to_value(&indexed).unwrap();
        assert_eq!(doc[INGEST_TIMESTAMP_FIELD], json!("2024-05-01T12:30:00+00:00"));
        assert_eq!(doc["title"], json!(""));
        assert_eq!(doc["abstract"], json!(""));
    }

    #[test]
    fn test_empty_id_is_not_a_document_key() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let with_id = |id: Option<&str>| CleanedRecord {
            id: id.map(str::to_string),
            ..Default::default()
        };

        assert_eq!(to_index_record(with_id(Some("0704.0001")), now).0.id(), Some("0704.0001"));
        assert_eq!(to_index_record(with_id(Some("")), now).0.id(), None);
        assert_eq!(to_index_record(with_id(None), now).0.id(), None);
    }
}
