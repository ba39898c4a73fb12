//! Record model and normalization
//!
//! A source line decodes into an untyped JSON object. [`RawRecord::from_map`]
//! pulls the fields the pipeline cares about out of that object without ever
//! failing: a field that is absent or has an unexpected JSON type is treated
//! as missing. [`CleanedRecord::from_raw`] then applies the cleaning rules.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of a record's `versions` list
///
/// `created` is kept as raw JSON: cleaning passes it through untouched, and
/// only the ingest stage rewrites it when it is a string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<Value>,

    /// Any other keys present on the source entry
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VersionEntry {
    fn from_map(map: &Map<String, Value>) -> Self {
        let mut extra = map.clone();
        let version = extra.remove("version").and_then(|v| match v {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        });
        let created = extra.remove("created").filter(|v| !v.is_null());

        Self {
            version,
            created,
            extra,
        }
    }
}

/// Typed view over one source line
///
/// Every field is optional; see the module docs for the decoding rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub id: Option<String>,
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub categories: Option<String>,
    /// Structured author names, each a list of name parts (`null` parts become `None`)
    pub authors_parsed: Vec<Vec<Option<String>>>,
    pub versions: Vec<VersionEntry>,
    pub update_date: Option<String>,
    pub submitter: Option<String>,
    pub journal_ref: Option<String>,
    pub doi: Option<String>,
}

impl RawRecord {
    /// Decode the known fields of a source object
    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            id: map.get("id").and_then(id_string),
            title: string_field(map, "title"),
            abstract_text: string_field(map, "abstract"),
            categories: string_field(map, "categories"),
            authors_parsed: map
                .get("authors_parsed")
                .and_then(Value::as_array)
                .map(|authors| {
                    authors
                        .iter()
                        .filter_map(Value::as_array)
                        .map(|parts| parts.iter().map(|p| p.as_str().map(str::to_string)).collect())
                        .collect()
                })
                .unwrap_or_default(),
            versions: map
                .get("versions")
                .and_then(Value::as_array)
                .map(|versions| {
                    versions
                        .iter()
                        .filter_map(Value::as_object)
                        .map(VersionEntry::from_map)
                        .collect()
                })
                .unwrap_or_default(),
            update_date: string_field(map, "update_date"),
            submitter: string_field(map, "submitter"),
            journal_ref: string_field(map, "journal-ref"),
            doi: string_field(map, "doi"),
        }
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

// Old-style arXiv ids such as 0704.0001 occasionally arrive as bare numbers.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The simplified, fixed-shape record written by the cleaning stage
///
/// Deserialization is lenient about missing keys so the ingest stage can
/// read files produced by older runs; every key is always serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanedRecord {
    pub id: Option<String>,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub categories: Vec<String>,
    pub authors: Vec<String>,
    pub versions: Vec<VersionEntry>,
    pub update_date: Option<String>,
    pub submitter: Option<String>,
    pub journal_ref: Option<String>,
    pub doi: Option<String>,
}

impl CleanedRecord {
    /// Apply the cleaning rules to a decoded source record
    pub fn from_raw(raw: RawRecord) -> Self {
        Self {
            id: raw.id,
            title: trimmed(raw.title),
            abstract_text: trimmed(raw.abstract_text),
            categories: raw
                .categories
                .as_deref()
                .map(|c| c.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            authors: raw.authors_parsed.iter().map(|parts| join_name_parts(parts)).collect(),
            versions: raw.versions,
            update_date: raw.update_date,
            submitter: raw.submitter,
            journal_ref: raw.journal_ref,
            doi: raw.doi,
        }
    }

    /// Decode and clean a source object in one step
    pub fn from_source(map: &Map<String, Value>) -> Self {
        Self::from_raw(RawRecord::from_map(map))
    }
}

fn trimmed(value: Option<String>) -> String {
    value.map(|s| s.trim().to_string()).unwrap_or_default()
}

/// Join the non-empty parts of a structured author name with single spaces
pub fn join_name_parts(parts: &[Option<String>]) -> String {
    parts
        .iter()
        .filter_map(|p| p.as_deref())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
