//! Cleaning and ingest pipelines
//!
//! Both runs share the same shape: read one line, transform it, then either
//! write it out or add it to a batch. Everything happens sequentially on the
//! calling task.

use crate::batch::BatchAccumulator;
use crate::config::{CleanConfig, IngestConfig};
use crate::dates::{to_index_record, IndexRecord};
use crate::index::{BulkReport, IndexLoader, SearchBackend};
use crate::reader::{LineOutcome, LineStream, SkipReason};
use crate::record::CleanedRecord;
use arxiv_common::Result;
use chrono::Utc;
use serde_jsonlines::AsyncJsonLinesWriter;
use serde_json::Value;
use tokio::io::BufWriter;
use tracing::{info, warn};

/// Log a progress line every this many cleaned records
pub const PROGRESS_INTERVAL: usize = 1000;

/// Summary of a cleaning run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub start_line: usize,
    pub processed: usize,
    pub skipped: usize,
}

/// Summary of an ingest run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub indexed: usize,
    pub batches: usize,
    pub skipped: usize,
    /// Documents the destination refused individually
    pub rejected: usize,
    pub date_warnings: usize,
}

impl IngestStats {
    fn record_batch(&mut self, report: &BulkReport) {
        self.indexed += report.written;
        self.rejected += report.rejected.len();
        self.batches += 1;
    }
}

fn log_skip(line: usize, reason: &SkipReason) {
    match reason {
        SkipReason::InvalidJson(_) => warn!(line, error = %reason, "Skipping invalid JSON"),
        _ => warn!(line, error = %reason, "Skipping line"),
    }
}

/// Clean a raw snapshot into the simplified line format
///
/// The input is opened before the output is created, so a missing input
/// never truncates an existing output file.
pub async fn clean_jsonl(config: &CleanConfig) -> Result<CleanStats> {
    info!(
        input = %config.input.display(),
        output = %config.output.display(),
        start_line = config.start_line,
        "Cleaning JSONL"
    );

    let mut lines = LineStream::open(&config.input, config.start_line).await?;
    let output = tokio::fs::File::create(&config.output).await?;
    let mut writer = AsyncJsonLinesWriter::new(BufWriter::new(output));

    let mut stats = CleanStats {
        start_line: config.start_line,
        ..Default::default()
    };

    while let Some(outcome) = lines.next_outcome().await? {
        match outcome {
            LineOutcome::Record { object, .. } => {
                let cleaned = CleanedRecord::from_source(&object);
                writer.write(&cleaned).await?;
                stats.processed += 1;
                if stats.processed % PROGRESS_INTERVAL == 0 {
                    info!(processed = stats.processed, "Processed {} lines", stats.processed);
                }
            },
            LineOutcome::Skipped { line, reason } => {
                log_skip(line, &reason);
                stats.skipped += 1;
            },
        }
    }

    writer.flush().await?;

    info!(
        processed = stats.processed,
        skipped = stats.skipped,
        "Cleaning complete. Total records processed: {}",
        stats.processed
    );
    Ok(stats)
}

/// Load cleaned records into the search index
///
/// Runs `EnsureIndex`, then reads, stamps and batches records, writing each
/// full batch and finally the partial one. Documents the destination refuses
/// are counted and logged; a batch that fails as a whole ends the run.
pub async fn ingest_jsonl<B: SearchBackend>(
    loader: &IndexLoader<B>,
    config: &IngestConfig,
) -> Result<IngestStats> {
    info!(
        input = %config.input.display(),
        index = %config.index,
        batch_size = %config.batch_size,
        start_line = config.start_line,
        "Ingesting JSONL"
    );

    let mut lines = LineStream::open(&config.input, config.start_line).await?;
    loader.ensure_index(&config.index).await?;

    let mut batch = BatchAccumulator::<IndexRecord>::new(config.batch_size);
    let mut stats = IngestStats::default();
    let mut first_line_in_batch = None;

    while let Some(outcome) = lines.next_outcome().await? {
        let (line, object) = match outcome {
            LineOutcome::Record { line, object } => (line, object),
            LineOutcome::Skipped { line, reason } => {
                log_skip(line, &reason);
                stats.skipped += 1;
                continue;
            },
        };

        let cleaned: CleanedRecord = match serde_json::from_value(Value::Object(object)) {
            Ok(record) => record,
            Err(e) => {
                log_skip(line, &SkipReason::Malformed(e.to_string()));
                stats.skipped += 1;
                continue;
            },
        };

        let (record, warnings) = to_index_record(cleaned, Utc::now());
        stats.date_warnings += warnings.len();
        first_line_in_batch.get_or_insert(line);

        if let Some(full) = batch.push(record) {
            let first = first_line_in_batch.take().unwrap_or(line);
            info!("Ingesting records from line {} to {}", first, line);
            let report = loader.bulk_write(&config.index, &full).await?;
            stats.record_batch(&report);
        }
    }

    if let Some(rest) = batch.finish() {
        info!("Ingesting final {} records", rest.len());
        let report = loader.bulk_write(&config.index, &rest).await?;
        stats.record_batch(&report);
    }

    info!(
        indexed = stats.indexed,
        batches = stats.batches,
        skipped = stats.skipped,
        rejected = stats.rejected,
        date_warnings = stats.date_warnings,
        "Ingestion complete"
    );
    Ok(stats)
}
