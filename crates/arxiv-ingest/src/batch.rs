//! Fixed-size batching for bulk writes

use arxiv_common::{PipelineError, Result};
use std::num::NonZeroUsize;

/// Default number of records per bulk request
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// A validated, positive batch size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSize(NonZeroUsize);

impl BatchSize {
    /// Validate a batch size taken from configuration
    ///
    /// Zero and negative values are rejected.
    pub fn new(size: i64) -> Result<Self> {
        usize::try_from(size)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Self)
            .ok_or_else(|| {
                PipelineError::config(format!("batch size must be a positive integer, got {}", size))
            })
    }

    pub fn get(self) -> usize {
        self.0.get()
    }

    /// Buffer capacity to reserve up front; very large sizes grow on demand
    fn initial_capacity(self) -> usize {
        self.get().min(DEFAULT_BATCH_SIZE)
    }
}

impl Default for BatchSize {
    fn default() -> Self {
        Self(NonZeroUsize::new(DEFAULT_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN))
    }
}

impl std::fmt::Display for BatchSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Collects items until a batch is full
#[derive(Debug)]
pub struct BatchAccumulator<T> {
    size: BatchSize,
    pending: Vec<T>,
}

impl<T> BatchAccumulator<T> {
    pub fn new(size: BatchSize) -> Self {
        Self {
            size,
            pending: Vec::with_capacity(size.initial_capacity()),
        }
    }

    /// Add an item, returning the full batch once the threshold is reached
    pub fn push(&mut self, item: T) -> Option<Vec<T>> {
        self.pending.push(item);
        if self.pending.len() >= self.size.get() {
            Some(std::mem::replace(
                &mut self.pending,
                Vec::with_capacity(self.size.initial_capacity()),
            ))
        } else {
            None
        }
    }

    /// Take whatever is left at end of stream
    pub fn finish(&mut self) -> Option<Vec<T>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
