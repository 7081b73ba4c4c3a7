//! Progress reporting and cooperative cancellation

use crate::{Error, Result};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Progress information for a bulk operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// Items processed so far
    pub processed: usize,
    /// Total number of items
    pub total: usize,
    /// Item currently being processed
    pub current_path: String,
}

impl Progress {
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.processed as f64 / self.total as f64 * 100.0
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({:.1}%) {}",
            self.processed,
            self.total,
            self.percent_complete(),
            self.current_path
        )
    }
}

/// Callback receiving progress updates
pub type ProgressSink = Arc<dyn Fn(Progress) + Send + Sync>;

/// Wrap a closure as a [`ProgressSink`]
pub fn sink<F>(f: F) -> ProgressSink
where
    F: Fn(Progress) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Per-run helper bundling the optional sink and token
pub(crate) struct RunControl<'a> {
    progress: Option<&'a ProgressSink>,
    cancel: Option<&'a CancellationToken>,
}

impl<'a> RunControl<'a> {
    pub(crate) fn new(
        progress: Option<&'a ProgressSink>,
        cancel: Option<&'a CancellationToken>,
    ) -> Self {
        Self { progress, cancel }
    }

    pub(crate) fn token(&self) -> Option<&'a CancellationToken> {
        self.cancel
    }

    /// Fail with [`Error::Cancelled`] once the token has fired
    pub(crate) fn checkpoint(&self) -> Result<()> {
        match self.cancel {
            Some(token) if token.is_cancelled() => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    pub(crate) fn report(&self, processed: usize, total: usize, current_path: &str) {
        if let Some(sink) = self.progress {
            sink(Progress {
                processed,
                total,
                current_path: current_path.to_string(),
            });
        }
    }
}
