// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Parallel per-file processing.
//!
//! Every file is an independent job run on tokio's blocking pool, with at
//! most `workers` jobs in flight. A failing file is recorded and the
//! batch carries on.

use crate::RepairError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Per-file results of a batch, each list sorted by path.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub successes: Vec<(PathBuf, T)>,
    pub failures: Vec<(PathBuf, RepairError)>,
}

impl<T> BatchOutcome<T> {
    /// Number of files processed.
    pub fn len(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if no file failed.
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} file(s): {} succeeded, {} failed",
            self.len(),
            self.successes.len(),
            self.failures.len()
        )
    }
}

/// Runs `job` over every path with at most `workers` running at once.
pub async fn run_batch<T, F>(paths: Vec<PathBuf>, workers: usize, job: F) -> BatchOutcome<T>
where
    T: Send + 'static,
    F: Fn(&Path) -> Result<T, RepairError> + Send + Sync + 'static,
{
    let permits = Arc::new(Semaphore::new(workers.max(1)));
    let job = Arc::new(job);
    let mut tasks = JoinSet::new();

    tracing::info!("processing {} file(s) with {} worker(s)", paths.len(), workers.max(1));
    for path in paths {
        let permits = Arc::clone(&permits);
        let job = Arc::clone(&job);
        tasks.spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(p) => p,
                Err(e) => return (path, Err(RepairError::Task(e.to_string()))),
            };
            let target = path.clone();
            let result = tokio::task::spawn_blocking(move || (*job)(&target))
                .await
                .unwrap_or_else(|e| Err(RepairError::Task(e.to_string())));
            (path, result)
        });
    }

    let mut outcome = BatchOutcome {
        successes: Vec::new(),
        failures: Vec::new(),
    };
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((path, Ok(value))) => outcome.successes.push((path, value)),
            Ok((path, Err(e))) => {
                tracing::warn!("'{}' failed: {e}", path.display());
                outcome.failures.push((path, e));
            }
            Err(e) => {
                tracing::error!("worker task lost: {e}");
                outcome
                    .failures
                    .push((PathBuf::new(), RepairError::Task(e.to_string())));
            }
        }
    }

    outcome.successes.sort_by(|a, b| a.0.cmp(&b.0));
    outcome.failures.sort_by(|a, b| a.0.cmp(&b.0));
    tracing::info!("{}", outcome.summary());
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_collects_and_continues() {
        let paths: Vec<PathBuf> = ["c", "a", "bad", "b"].iter().map(PathBuf::from).collect();
        let outcome = run_batch(paths, 2, |p: &Path| {
            if p == Path::new("bad") {
                Err(RepairError::Task("boom".into()))
            } else {
                Ok(p.to_string_lossy().len())
            }
        })
        .await;

        assert_eq!(outcome.len(), 4);
        assert_eq!(outcome.failures.len(), 1);
        let names: Vec<&Path> = outcome.successes.iter().map(|(p, _)| p.as_path()).collect();
        assert_eq!(names, [Path::new("a"), Path::new("b"), Path::new("c")]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_respects_worker_limit() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (a, p) = (Arc::clone(&active), Arc::clone(&peak));

        let paths: Vec<PathBuf> = (0..16).map(|i| PathBuf::from(format!("m{i}"))).collect();
        let outcome = run_batch(paths, 2, move |_: &Path| {
            let now = a.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(5));
            a.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

        assert!(outcome.all_succeeded());
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_panicking_job_is_a_failure() {
        let outcome = run_batch(vec![PathBuf::from("x")], 1, |_: &Path| -> Result<(), RepairError> {
            panic!("job exploded")
        })
        .await;
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].0, PathBuf::from("x"));
    }
}
