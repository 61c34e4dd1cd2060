//! Sequential multi-file uploads with per-item results.

use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::upload::{UploadFile, UploadKind, display_name};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchProgress {
    pub index: usize,
    pub total: usize,
    pub filename: String,
    /// Overall completion in `0.0..=1.0`.
    pub fraction: f64,
    pub finished: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ItemOutcome<T> {
    Success { result: T },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItem<T> {
    pub filename: String,
    pub elapsed_ms: u64,
    #[serde(flatten)]
    pub outcome: ItemOutcome<T>,
}

impl<T> BatchItem<T> {
    pub fn result(&self) -> Option<&T> {
        match &self.outcome {
            ItemOutcome::Success { result } => Some(result),
            ItemOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ItemOutcome::Success { .. } => None,
            ItemOutcome::Failed { error } => Some(error),
        }
    }
}

/// One entry per input, in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport<T> {
    pub items: Vec<BatchItem<T>>,
}

impl<T> BatchReport<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.result().is_some()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }
}

/// Uploads `paths` one at a time through `upload`.
///
/// Unreadable files and types `kind` does not accept become failed entries
/// without a request. A failure never stops the remaining files.
pub async fn run_batch<P, T, F, Fut>(
    paths: &[P],
    kind: UploadKind,
    mut upload: F,
    mut progress: impl FnMut(BatchProgress),
) -> BatchReport<T>
where
    P: AsRef<Path>,
    F: FnMut(UploadFile) -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let total = paths.len();
    let mut items = Vec::with_capacity(total);

    for (index, path) in paths.iter().enumerate() {
        let path = path.as_ref();
        let filename = display_name(path);
        progress(BatchProgress {
            index,
            total,
            filename: filename.clone(),
            fraction: (index as f64 + 0.5) / total as f64,
            finished: false,
        });

        let started = Instant::now();
        let result = match UploadFile::read(path).await {
            Ok(file) => match kind.check(&file) {
                Ok(()) => upload(file).await,
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        let elapsed_ms = millis(started.elapsed());

        let outcome = match result {
            Ok(result) => ItemOutcome::Success { result },
            Err(err) => {
                warn!("Upload of {filename} failed: {err}");
                ItemOutcome::Failed {
                    error: err.to_string(),
                }
            }
        };
        items.push(BatchItem {
            filename: filename.clone(),
            elapsed_ms,
            outcome,
        });

        progress(BatchProgress {
            index,
            total,
            filename,
            fraction: (index + 1) as f64 / total as f64,
            finished: true,
        });
    }

    let report = BatchReport { items };
    info!(
        "Batch finished: {} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );
    report
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
