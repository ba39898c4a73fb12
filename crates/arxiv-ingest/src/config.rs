//! Run configuration
//!
//! Every run is described by a validated config struct. Validation happens
//! before any file is created or request is sent, so a bad option never
//! leaves a half-written output behind.

use crate::batch::BatchSize;
use crate::elasticsearch::{DEFAULT_ES_URL, DEFAULT_TIMEOUT_SECS};
use crate::index::DEFAULT_INDEX_NAME;
use arxiv_common::{PipelineError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Public arXiv metadata snapshot on Kaggle
pub const DEFAULT_SNAPSHOT_URL: &str =
    "https://www.kaggle.com/api/v1/datasets/download/Cornell-University/arxiv";

/// Characters Elasticsearch refuses in index names
const INVALID_INDEX_CHARS: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|', ' ', ',', '#', ':'];

/// Cleaning stage: raw snapshot lines to cleaned lines
#[derive(Debug, Clone)]
pub struct CleanConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub start_line: usize,
}

impl CleanConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, start_line: usize) -> Result<Self> {
        let config = Self {
            input: input.into(),
            output: output.into(),
            start_line,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        require_input_file(&self.input)?;
        if same_file(&self.input, &self.output) {
            return Err(PipelineError::config("output path must differ from input path"));
        }
        Ok(())
    }
}

/// Whether `output` names the existing file `input`, however either is spelled
///
/// A not-yet-existing output is resolved through its parent directory.
fn same_file(input: &Path, output: &Path) -> bool {
    let Ok(input) = std::fs::canonicalize(input) else {
        return false;
    };

    let output = match std::fs::canonicalize(output) {
        Ok(path) => path,
        Err(_) => {
            let parent = match output.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            match (std::fs::canonicalize(parent), output.file_name()) {
                (Ok(parent), Some(name)) => parent.join(name),
                _ => return false,
            }
        },
    };

    input == output
}

/// Ingest stage: cleaned lines to the search index
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub input: PathBuf,
    pub start_line: usize,
    pub batch_size: BatchSize,
    pub index: String,
    pub es_url: String,
    pub timeout: Duration,
}

impl IngestConfig {
    /// Config with defaults for everything but the input path
    pub fn for_input(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            start_line: 0,
            batch_size: BatchSize::default(),
            index: DEFAULT_INDEX_NAME.to_string(),
            es_url: DEFAULT_ES_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_input_file(&self.input)?;
        validate_index_name(&self.index)?;
        if self.timeout.is_zero() {
            return Err(PipelineError::config("request timeout must be positive"));
        }
        Ok(())
    }
}

/// Snapshot download
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub url: String,
    pub output_dir: PathBuf,
    pub timeout: Duration,
}

impl DownloadConfig {
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.url)
            .map_err(|e| PipelineError::config(format!("invalid snapshot URL '{}': {}", self.url, e)))?;
        if self.output_dir.is_file() {
            return Err(PipelineError::config(format!(
                "output '{}' is a file, expected a directory",
                self.output_dir.display()
            )));
        }
        Ok(())
    }
}

/// Convert a timeout given in seconds, rejecting zero
pub fn timeout_from_secs(secs: u64) -> Result<Duration> {
    if secs == 0 {
        return Err(PipelineError::config("request timeout must be positive"));
    }
    Ok(Duration::from_secs(secs))
}

fn require_input_file(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(PipelineError::InputNotFound(path.display().to_string()));
    }
    if !path.is_file() {
        return Err(PipelineError::config(format!("input '{}' is not a file", path.display())));
    }
    Ok(())
}

/// Check an index name against the destination's naming rules
pub fn validate_index_name(name: &str) -> Result<()> {
    let problem = if name.is_empty() {
        Some("must not be empty")
    } else if name.chars().any(char::is_uppercase) {
        Some("must be lowercase")
    } else if name.starts_with(['-', '_', '+']) {
        Some("must not start with '-', '_' or '+'")
    } else if name.contains(INVALID_INDEX_CHARS) {
        Some("contains a forbidden character")
    } else if name == "." || name == ".." {
        Some("must not be '.' or '..'")
    } else {
        None
    };

    match problem {
        Some(problem) => Err(PipelineError::config(format!("index name '{}' {}", name, problem))),
        None => Ok(()),
    }
}
