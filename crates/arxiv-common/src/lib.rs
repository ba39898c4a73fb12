//! arXiv Pipeline Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging bootstrap for the pipeline crates.
//!
//! # Example
//!
//! ```no_run
//! use arxiv_common::logging::{init_logging, LogConfig};
//! use arxiv_common::{PipelineError, Result};
//!
//! fn run() -> Result<()> {
//!     let config = LogConfig::from_env().map_err(|e| PipelineError::Config(e.to_string()))?;
//!     let _guard = init_logging(&config).map_err(|e| PipelineError::Config(e.to_string()))?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{PipelineError, Result};
