//! Ingest pipeline against a mocked Elasticsearch
//!
//! These tests validate:
//! - Index creation only when the index is absent
//! - Batch boundaries of bulk requests
//! - Bulk request shape (NDJSON actions keyed by id)
//! - Item-level rejections counted without stopping later batches
//! - Whole-request failures ending the run
//! - Unreachable destinations failing before any record is read

use arxiv_common::PipelineError;
use arxiv_ingest::batch::BatchSize;
use arxiv_ingest::config::IngestConfig;
use arxiv_ingest::elasticsearch::ElasticsearchClient;
use arxiv_ingest::index::{index_mapping, IndexLoader};
use arxiv_ingest::pipeline::ingest_jsonl;
use serde_json::{json, Value};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

/// Helper to write `count` cleaned records to a JSONL file
fn write_cleaned(dir: &TempDir, count: usize) -> PathBuf {
    let path = dir.path().join("arxiv-clean.jsonl");
    let mut file = std::fs::File::create(&path).expect("Failed to create input");
    for i in 0..count {
        let record = json!({
            "id": format!("2301.{:05}", i),
            "title": format!("Paper {}", i),
            "abstract": "An abstract.",
            "categories": ["cs.AI"],
            "authors": ["Doe J"],
            "versions": [{"version": "v1", "created": "Mon, 2 Jan 2023 10:00:00 GMT"}],
            "update_date": "2023-01-05",
            "submitter": null,
            "journal_ref": null,
            "doi": null
        });
        writeln!(file, "{}", record).expect("Failed to write input");
    }
    path
}

fn bulk_ok() -> Value {
    json!({ "took": 3, "errors": false, "items": [] })
}

fn config_for(server: &MockServer, input: PathBuf, batch_size: i64) -> IngestConfig {
    let mut config = IngestConfig::for_input(input);
    config.batch_size = BatchSize::new(batch_size).expect("valid batch size");
    config.es_url = server.uri();
    config
}

fn loader_for(config: &IngestConfig) -> IndexLoader<ElasticsearchClient> {
    let client = ElasticsearchClient::new(&config.es_url, Duration::from_secs(5))
        .expect("Failed to build client");
    IndexLoader::new(client)
}

#[tokio::test]
async fn test_creates_missing_index_and_writes_three_batches() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/arxiv-papers"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/arxiv-papers"))
        .and(body_json(index_mapping()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .and(header("content-type", "application/x-ndjson"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bulk_ok()))
        .expect(3)
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = config_for(&server, write_cleaned(&dir, 2500), 1000);

    let stats = ingest_jsonl(&loader_for(&config), &config).await.expect("ingest failed");
    assert_eq!(stats.indexed, 2500);
    assert_eq!(stats.batches, 3);

    let requests = server.received_requests().await.expect("request recording enabled");
    let bulk_line_counts: Vec<usize> = requests
        .iter()
        .filter(|r| r.url.path() == "/_bulk")
        .map(|r| String::from_utf8_lossy(&r.body).lines().count())
        .collect();
    // Two lines (action + document) per record
    assert_eq!(bulk_line_counts, vec![2000, 2000, 1000]);
}

#[tokio::test]
async fn test_existing_index_is_not_recreated() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/arxiv-papers"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bulk_ok()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = config_for(&server, write_cleaned(&dir, 3), 1000);

    let stats = ingest_jsonl(&loader_for(&config), &config).await.expect("ingest failed");
    assert_eq!(stats.indexed, 3);
}

#[tokio::test]
async fn test_bulk_body_is_keyed_by_id_with_iso_dates() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bulk_ok()))
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = config_for(&server, write_cleaned(&dir, 1), 1000);
    ingest_jsonl(&loader_for(&config), &config).await.expect("ingest failed");

    let requests = server.received_requests().await.expect("request recording enabled");
    let bulk = requests
        .iter()
        .find(|r| r.url.path() == "/_bulk")
        .expect("no bulk request");
    let body = String::from_utf8_lossy(&bulk.body);
    let lines: Vec<Value> = body
        .lines()
        .map(|l| serde_json::from_str(l).expect("bulk line is JSON"))
        .collect();

    assert_eq!(lines[0], json!({"index": {"_index": "arxiv-papers", "_id": "2301.00000"}}));
    assert_eq!(lines[1]["versions"][0]["created"], "2023-01-02T10:00:00+00:00");
    assert!(lines[1]["__ingest_timestamp"].is_string());
    assert_eq!(lines[1]["title"], "Paper 0");
}

#[tokio::test]
async fn test_rejected_item_does_not_stop_next_batch() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    // First batch: one document refused by the mapping
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": true,
            "items": [
                {"index": {"_id": "2301.00000", "status": 201}},
                {"index": {"_id": "2301.00001", "status": 400, "error": {
                    "type": "mapper_parsing_exception",
                    "reason": "failed to parse field [versions.created]"
                }}}
            ]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bulk_ok()))
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = config_for(&server, write_cleaned(&dir, 4), 2);

    let stats = ingest_jsonl(&loader_for(&config), &config).await.expect("ingest failed");
    assert_eq!(stats.batches, 2);
    assert_eq!(stats.indexed, 3);
    assert_eq!(stats.rejected, 1);

    let requests = server.received_requests().await.expect("request recording enabled");
    let bulk_requests = requests.iter().filter(|r| r.url.path() == "/_bulk").count();
    assert_eq!(bulk_requests, 2);
}

#[tokio::test]
async fn test_bulk_response_without_items_is_batch_failure() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errors": false})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = config_for(&server, write_cleaned(&dir, 3), 1000);

    let err = ingest_jsonl(&loader_for(&config), &config).await.unwrap_err();
    match err {
        PipelineError::BulkWrite {
            failed,
            total,
            reason,
            ..
        } => {
            assert_eq!(failed, 3);
            assert_eq!(total, 3);
            assert!(reason.contains("no items"));
        },
        other => panic!("expected BulkWrite, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_on_bulk_is_batch_failure() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(ResponseTemplate::new(503).set_body_string("cluster unavailable"))
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = config_for(&server, write_cleaned(&dir, 5), 2);

    let err = ingest_jsonl(&loader_for(&config), &config).await.unwrap_err();
    assert!(matches!(err, PipelineError::BulkWrite { failed: 2, total: 2, .. }));
}

#[tokio::test]
async fn test_unreachable_destination_is_setup_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = IngestConfig::for_input(write_cleaned(&dir, 1));
    // Nothing listens on the discard port
    config.es_url = "http://127.0.0.1:9".to_string();

    let err = ingest_jsonl(&loader_for(&config), &config).await.unwrap_err();
    assert!(matches!(err, PipelineError::Destination(_)));
    assert!(err.is_setup_error());
}
