//! Concurrent backup-CDN resolution.

use std::collections::HashSet;
use std::future::Future;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::debug;

use crate::error::Result;
use crate::model::StreamCandidate;

/// Merges alternate CDN candidates behind a primary one.
#[derive(Debug, Clone, Copy)]
pub struct BackupAggregator {
    max: usize,
}

impl BackupAggregator {
    pub fn new(max: usize) -> Self {
        Self { max }
    }

    /// Run every task concurrently and keep the successes.
    ///
    /// All tasks are driven to completion even once the cap is reached; a
    /// failing task never cancels its siblings. Kept candidates are in
    /// completion order.
    pub async fn collect<I, F>(&self, primary: &str, tasks: I) -> Vec<StreamCandidate>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = Result<StreamCandidate>>,
    {
        let mut pending: FuturesUnordered<F> = tasks.into_iter().collect();
        let total = pending.len();

        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(primary.to_string());
        let mut kept = Vec::new();

        while let Some(outcome) = pending.next().await {
            match outcome {
                Ok(candidate) if candidate.url.is_empty() => {
                    debug!(cdn = %candidate.cdn, "backup resolved to empty url");
                }
                Ok(candidate) => {
                    if kept.len() < self.max && seen.insert(candidate.url.clone()) {
                        kept.push(candidate);
                    } else {
                        debug!(cdn = %candidate.cdn, "backup dropped (duplicate or over cap)");
                    }
                }
                Err(e) => debug!(error = %e, "backup failed"),
            }
        }

        debug!(total, kept = kept.len(), "backup aggregation settled");
        kept
    }
}
