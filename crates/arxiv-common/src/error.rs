//! Error types for the arXiv pipeline
//!
//! Only run-level failures live here. Per-line problems (bad JSON, bad
//! embedded dates) are reported as values by the stages that meet them.

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input not found: {0}")]
    InputNotFound(String),

    /// The search service could not be reached or rejected a request
    #[error("Destination error: {0}")]
    Destination(String),

    /// A bulk request failed as a whole
    #[error("Bulk write to '{index}' failed for {failed} of {total} documents: {reason}")]
    BulkWrite {
        index: String,
        failed: usize,
        total: usize,
        reason: String,
    },

    #[error("Download error: {0}")]
    Download(String),
}

impl PipelineError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a destination error
    pub fn destination(msg: impl Into<String>) -> Self {
        Self::Destination(msg.into())
    }

    /// Create a download error
    pub fn download(msg: impl Into<String>) -> Self {
        Self::Download(msg.into())
    }

    /// Whether the error happened before any record could be processed
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::InputNotFound(_) | Self::Destination(_)
        )
    }
}
