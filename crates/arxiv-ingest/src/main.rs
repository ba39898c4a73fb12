//! arxiv-ingest - arXiv snapshot pipeline

use anyhow::Result;
use arxiv_common::logging::{init_logging, LogConfig, LogLevel};
use arxiv_common::PipelineError;
use arxiv_ingest::batch::{BatchSize, DEFAULT_BATCH_SIZE};
use arxiv_ingest::config::{
    timeout_from_secs, CleanConfig, DownloadConfig, IngestConfig, DEFAULT_SNAPSHOT_URL,
};
use arxiv_ingest::elasticsearch::{ElasticsearchClient, DEFAULT_ES_URL, DEFAULT_TIMEOUT_SECS};
use arxiv_ingest::index::{IndexLoader, DEFAULT_INDEX_NAME};
use arxiv_ingest::{download, pipeline};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "arxiv-ingest")]
#[command(author, version, about = "arXiv metadata snapshot pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download and unpack the arXiv metadata snapshot
    Download {
        /// Directory to place the archive and extracted snapshot in
        #[arg(short, long, env = "ARXIV_OUTPUT", default_value = "./data/raw")]
        output: PathBuf,

        /// Snapshot archive URL
        #[arg(long, env = "ARXIV_SNAPSHOT_URL", default_value = DEFAULT_SNAPSHOT_URL)]
        url: String,

        /// Connect timeout in seconds
        #[arg(long, env = "ARXIV_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout_secs: u64,
    },

    /// Clean a raw snapshot into simplified JSON lines
    Clean {
        /// Path to the raw snapshot (JSON lines)
        #[arg(short, long, env = "ARXIV_INPUT")]
        input: PathBuf,

        /// Path of the cleaned output file
        #[arg(short, long, env = "ARXIV_OUTPUT")]
        output: PathBuf,

        /// Zero-based line to start processing from
        #[arg(long, env = "ARXIV_START_LINE", default_value_t = 0)]
        start_line: usize,
    },

    /// Bulk-load cleaned JSON lines into Elasticsearch
    Ingest {
        /// Path to the cleaned JSON lines file
        #[arg(short, long, env = "ARXIV_INPUT")]
        input: PathBuf,

        /// Number of records per bulk request
        #[arg(
            long,
            env = "ARXIV_BATCH_SIZE",
            default_value_t = DEFAULT_BATCH_SIZE as i64,
            allow_negative_numbers = true
        )]
        batch_size: i64,

        /// Zero-based line to start processing from
        #[arg(long, env = "ARXIV_START_LINE", default_value_t = 0)]
        start_line: usize,

        /// Destination index name
        #[arg(long, env = "ARXIV_INDEX", default_value = DEFAULT_INDEX_NAME)]
        index: String,

        /// Elasticsearch base URL
        #[arg(long, env = "ARXIV_ES_URL", default_value = DEFAULT_ES_URL)]
        es_url: String,

        /// Request timeout in seconds
        #[arg(long, env = "ARXIV_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout_secs: u64,
    },
}

/// Tell the operator whether the stage got as far as processing records
fn stage_error(stage: &str, err: PipelineError) -> anyhow::Error {
    let outcome = if err.is_setup_error() {
        "could not start"
    } else {
        "failed"
    };
    anyhow::Error::new(err).context(format!("{} {}", stage, outcome))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // A missing .env file is normal
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("arxiv-ingest")
        .build()
        .merge_env()?;
    let _log_guard = init_logging(&log_config)?;

    match cli.command {
        Command::Download {
            output,
            url,
            timeout_secs,
        } => {
            let timeout =
                timeout_from_secs(timeout_secs).map_err(|e| stage_error("Snapshot download", e))?;
            let config = DownloadConfig {
                url,
                output_dir: output,
                timeout,
            };
            let snapshot = download::download_snapshot(&config)
                .await
                .map_err(|e| stage_error("Snapshot download", e))?;
            info!(snapshot = %snapshot.display(), "Done");
        },
        Command::Clean {
            input,
            output,
            start_line,
        } => {
            let config =
                CleanConfig::new(input, output, start_line).map_err(|e| stage_error("Cleaning", e))?;
            pipeline::clean_jsonl(&config)
                .await
                .map_err(|e| stage_error("Cleaning", e))?;
        },
        Command::Ingest {
            input,
            batch_size,
            start_line,
            index,
            es_url,
            timeout_secs,
        } => {
            let setup = || -> arxiv_common::Result<(IngestConfig, ElasticsearchClient)> {
                let config = IngestConfig {
                    input,
                    start_line,
                    batch_size: BatchSize::new(batch_size)?,
                    index,
                    es_url,
                    timeout: timeout_from_secs(timeout_secs)?,
                };
                config.validate()?;
                let client = ElasticsearchClient::new(&config.es_url, config.timeout)?;
                Ok((config, client))
            };
            let (config, client) = setup().map_err(|e| stage_error("Ingestion", e))?;

            let loader = IndexLoader::new(client);
            let stats = pipeline::ingest_jsonl(&loader, &config)
                .await
                .map_err(|e| stage_error("Ingestion", e))?;
            info!(indexed = stats.indexed, rejected = stats.rejected, "Done");
        },
    }

    Ok(())
}
