//! Index loading
//!
//! [`IndexLoader`] owns the fixed document mapping and drives a
//! [`SearchBackend`]. The backend is a trait so the pipeline can run against
//! an in-memory fake in tests.

use crate::dates::{IndexRecord, INGEST_TIMESTAMP_FIELD};
use arxiv_common::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// Default destination index name
pub const DEFAULT_INDEX_NAME: &str = "arxiv-papers";

/// One document of a bulk request
#[derive(Debug, Clone, PartialEq)]
pub struct BulkDocument {
    /// Document key; `None` lets the destination assign one
    pub id: Option<String>,
    pub source: Value,
}

/// A document the destination refused inside an otherwise accepted bulk request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedDocument {
    pub id: Option<String>,
    pub reason: String,
}

/// Result of one bulk write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    /// Documents the destination accepted
    pub written: usize,
    pub rejected: Vec<RejectedDocument>,
}

/// Operations the loader needs from a search service
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn index_exists(&self, index: &str) -> Result<bool>;

    async fn create_index(&self, index: &str, body: &Value) -> Result<()>;

    /// Upsert every document
    ///
    /// Fails only when the request as a whole fails. Documents refused
    /// individually are returned.
    async fn bulk_upsert(&self, index: &str, docs: &[BulkDocument]) -> Result<Vec<RejectedDocument>>;
}

/// What `ensure_index` found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created,
    AlreadyExists,
}

/// Index creation body with the fixed field mapping
pub fn index_mapping() -> Value {
    let mut properties = json!({
        "id": { "type": "keyword" },
        "title": { "type": "text" },
        "abstract": { "type": "text" },
        "categories": { "type": "keyword" },
        "authors": { "type": "keyword" },
        "update_date": { "type": "date" },
        "submitter": { "type": "keyword" },
        "journal_ref": { "type": "text" },
        "doi": { "type": "keyword" },
        "versions": {
            "type": "nested",
            "properties": {
                "version": { "type": "keyword" },
                "created": { "type": "date" }
            }
        }
    });
    properties[INGEST_TIMESTAMP_FIELD] = json!({ "type": "date" });

    json!({ "mappings": { "properties": properties } })
}

/// Writes index records to a search backend
pub struct IndexLoader<B> {
    backend: B,
}

impl<B: SearchBackend> IndexLoader<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Create the index with the fixed mapping unless it already exists
    pub async fn ensure_index(&self, index: &str) -> Result<EnsureOutcome> {
        if self.backend.index_exists(index).await? {
            info!(index = %index, "Index already exists");
            return Ok(EnsureOutcome::AlreadyExists);
        }

        info!(index = %index, "Creating index");
        self.backend.create_index(index, &index_mapping()).await?;
        Ok(EnsureOutcome::Created)
    }

    /// Upsert a batch keyed by record id
    ///
    /// Each rejected document is logged and reported; the rest of the batch
    /// still counts as written.
    pub async fn bulk_write(&self, index: &str, records: &[IndexRecord]) -> Result<BulkReport> {
        if records.is_empty() {
            return Ok(BulkReport::default());
        }

        let docs = records
            .iter()
            .map(|record| {
                Ok(BulkDocument {
                    id: record.id().map(str::to_string),
                    source: serde_json::to_value(record)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let rejected = self.backend.bulk_upsert(index, &docs).await?;
        for doc in &rejected {
            warn!(
                index = %index,
                id = doc.id.as_deref().unwrap_or("<none>"),
                reason = %doc.reason,
                "Document rejected"
            );
        }

        let written = docs.len().saturating_sub(rejected.len());
        debug!(index = %index, written, rejected = rejected.len(), "Bulk write complete");
        Ok(BulkReport { written, rejected })
    }
}
