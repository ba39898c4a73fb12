//! arXiv Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Batch pipeline for the arXiv metadata snapshot.
//!
//! # Stages
//!
//! - **download**: fetch and unpack the zipped snapshot
//! - **clean**: turn raw snapshot lines into [`record::CleanedRecord`] lines
//! - **ingest**: stamp, normalize dates and bulk-load cleaned lines into
//!   an Elasticsearch index
//!
//! # Example
//!
//! ```no_run
//! use arxiv_ingest::config::IngestConfig;
//! use arxiv_ingest::elasticsearch::ElasticsearchClient;
//! use arxiv_ingest::index::IndexLoader;
//! use arxiv_ingest::pipeline::ingest_jsonl;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::for_input("./data/arxiv-clean.jsonl");
//!     config.validate()?;
//!
//!     let client = ElasticsearchClient::new(&config.es_url, config.timeout)?;
//!     let stats = ingest_jsonl(&IndexLoader::new(client), &config).await?;
//!     println!("indexed {} records", stats.indexed);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod config;
pub mod dates;
pub mod download;
pub mod elasticsearch;
pub mod index;
pub mod pipeline;
pub mod reader;
pub mod record;
