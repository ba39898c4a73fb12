//! Elasticsearch REST client
//!
//! Implements [`SearchBackend`] over the plain HTTP API with `reqwest`.

use crate::index::{BulkDocument, RejectedDocument, SearchBackend};
use arxiv_common::{PipelineError, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

// ============================================================================
// Client Constants
// ============================================================================

/// Default search service URL
pub const DEFAULT_ES_URL: &str = "http://localhost:9200";

/// Default request timeout in seconds. Bulk requests of 1000 arXiv records
/// run to a few megabytes, so this is generous.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Client for a single Elasticsearch cluster
#[derive(Clone)]
pub struct ElasticsearchClient {
    http: Client,
    base_url: Url,
}

impl ElasticsearchClient {
    /// Create a client for `base_url` with an explicit request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| PipelineError::config(format!("invalid search URL '{}': {}", base_url, e)))?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(PipelineError::config(format!(
                "search URL must use http or https, got '{}'",
                base_url.scheme()
            )));
        }

        // Url::join replaces the last segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| PipelineError::config(format!("invalid request path '{}': {}", path, e)))
    }
}

fn unreachable(url: &Url, err: reqwest::Error) -> PipelineError {
    PipelineError::destination(format!("request to {} failed: {}", url, err))
}

#[async_trait]
impl SearchBackend for ElasticsearchClient {
    async fn index_exists(&self, index: &str) -> Result<bool> {
        let url = self.url(index)?;
        let response = self
            .http
            .head(url.clone())
            .send()
            .await
            .map_err(|e| unreachable(&url, e))?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(PipelineError::destination(format!(
                "unexpected status {} checking index '{}'",
                status, index
            ))),
        }
    }

    async fn create_index(&self, index: &str, body: &Value) -> Result<()> {
        let url = self.url(index)?;
        let response = self
            .http
            .put(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| unreachable(&url, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        // Another run created it between our existence check and now
        if status == StatusCode::BAD_REQUEST && text.contains("resource_already_exists_exception") {
            debug!(index = %index, "Index created concurrently");
            return Ok(());
        }

        Err(PipelineError::destination(format!(
            "failed to create index '{}' ({}): {}",
            index, status, text
        )))
    }

    async fn bulk_upsert(&self, index: &str, docs: &[BulkDocument]) -> Result<Vec<RejectedDocument>> {
        let url = self.url("_bulk")?;
        let body = bulk_body(index, docs)?;
        let batch_failed = |reason: String| PipelineError::BulkWrite {
            index: index.to_string(),
            failed: docs.len(),
            total: docs.len(),
            reason,
        };

        let response = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|e| batch_failed(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(batch_failed(format!("status {}: {}", status, text)));
        }

        let parsed: BulkResponse = response
            .json()
            .await
            .map_err(|e| batch_failed(format!("unreadable bulk response: {}", e)))?;

        let Some(items) = parsed.items else {
            return Err(batch_failed("bulk response has no items".to_string()));
        };

        let rejected: Vec<RejectedDocument> = items
            .iter()
            .flat_map(|item| item.values())
            .filter_map(BulkItem::rejection)
            .collect();

        if parsed.errors && rejected.is_empty() {
            return Err(batch_failed("bulk response flagged errors without item details".to_string()));
        }
        Ok(rejected)
    }
}

/// Build the NDJSON body of a bulk request: an action line then the document, per record
pub fn bulk_body(index: &str, docs: &[BulkDocument]) -> Result<String> {
    let mut body = String::new();
    for doc in docs {
        let action = match doc.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => json!({ "index": { "_index": index, "_id": id } }),
            None => json!({ "index": { "_index": index } }),
        };
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(&doc.source)?);
        body.push('\n');
    }
    Ok(body)
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
    items: Option<Vec<HashMap<String, BulkItem>>>,
}

#[derive(Debug, Deserialize)]
struct BulkItem {
    #[serde(default, rename = "_id")]
    id: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

impl BulkItem {
    fn rejection(&self) -> Option<RejectedDocument> {
        let error = self.error.as_ref()?;
        let kind = error.get("type").and_then(Value::as_str);
        let reason = match (kind, error.get("reason").and_then(Value::as_str)) {
            (Some(kind), Some(reason)) => format!("{}: {}", kind, reason),
            _ => error.to_string(),
        };
        Some(RejectedDocument {
            id: self.id.clone(),
            reason,
        })
    }
}
