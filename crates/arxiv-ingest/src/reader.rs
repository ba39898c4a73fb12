//! Line-delimited JSON reader
//!
//! Produces one [`LineOutcome`] per physical line at or after the requested
//! start line. Lines before the start line are consumed without being parsed.
//! A line that is not a JSON object becomes [`LineOutcome::Skipped`]; only I/O
//! failures on the underlying reader end the stream with an error.

use arxiv_common::{PipelineError, Result};
use serde_json::{Map, Value};
use std::path::Path;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// Why a line was not turned into a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Result of reading one line
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Record {
        /// Zero-based line number in the source
        line: usize,
        object: Map<String, Value>,
    },
    Skipped {
        line: usize,
        reason: SkipReason,
    },
}

impl LineOutcome {
    pub fn line(&self) -> usize {
        match self {
            LineOutcome::Record { line, .. } | LineOutcome::Skipped { line, .. } => *line,
        }
    }
}

/// Lazy reader over a line-delimited JSON source
pub struct LineStream<R> {
    reader: R,
    start_line: usize,
    next_line: usize,
    buf: Vec<u8>,
}

impl LineStream<BufReader<File>> {
    /// Open a file for reading from `start_line`
    ///
    /// Fails with [`PipelineError::InputNotFound`] when the file does not exist.
    pub async fn open(path: impl AsRef<Path>, start_line: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PipelineError::InputNotFound(path.display().to_string()),
            _ => PipelineError::Io(e),
        })?;
        Ok(Self::new(BufReader::new(file), start_line))
    }
}

impl<R: AsyncBufRead + Unpin> LineStream<R> {
    pub fn new(reader: R, start_line: usize) -> Self {
        Self {
            reader,
            start_line,
            next_line: 0,
            buf: Vec::new(),
        }
    }

    /// Read the next line at or after the start line
    ///
    /// Returns `Ok(None)` at end of input.
    pub async fn next_outcome(&mut self) -> Result<Option<LineOutcome>> {
        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
                return Ok(None);
            }

            let line = self.next_line;
            self.next_line += 1;
            if line < self.start_line {
                continue;
            }

            return Ok(Some(parse_line(line, &self.buf)));
        }
    }
}

fn parse_line(line: usize, raw: &[u8]) -> LineOutcome {
    let trimmed = raw
        .strip_suffix(b"\n")
        .map(|r| r.strip_suffix(b"\r").unwrap_or(r))
        .unwrap_or(raw);

    match serde_json::from_slice::<Value>(trimmed) {
        Ok(Value::Object(object)) => LineOutcome::Record { line, object },
        Ok(other) => LineOutcome::Skipped {
            line,
            reason: SkipReason::NotAnObject(json_kind(&other)),
        },
        Err(e) => LineOutcome::Skipped {
            line,
            reason: SkipReason::InvalidJson(e.to_string()),
        },
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
