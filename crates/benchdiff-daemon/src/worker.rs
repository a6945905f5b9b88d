//! Queue consumer.

use crate::queue::{ExecutionQueue, RunIdentifier};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How long the consumer waits for work before rechecking shutdown.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// What an executor reports for a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    /// Uuid of the stored execution record.
    pub uuid: Uuid,
    pub results: usize,
    pub failures: usize,
}

/// Runs a claimed identifier to completion. Called on the blocking pool.
pub trait Executor: Send + Sync + 'static {
    fn execute(&self, identifier: &RunIdentifier) -> Result<ExecutionSummary, String>;
}

/// Outcome of one consumed run.
pub type Processed = (RunIdentifier, Result<ExecutionSummary, String>);

/// Consume runs until `shutdown` is set. Returns how many runs were processed.
///
/// Runs execute one at a time. Each claimed run is completed in the queue
/// whatever the executor returns.
pub async fn run_consumer(
    queue: Arc<ExecutionQueue>,
    executor: Arc<dyn Executor>,
    shutdown: Arc<AtomicBool>,
) -> usize {
    let mut processed = 0;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!(processed, "shutdown requested, consumer exiting");
            break;
        }

        let Ok(identifier) = tokio::time::timeout(POLL_INTERVAL, queue.claim_next()).await else {
            continue;
        };
        execute_claimed(&queue, &executor, identifier).await;
        processed += 1;
    }
    processed
}

/// Consume pending runs until none is left.
pub async fn drain(queue: Arc<ExecutionQueue>, executor: Arc<dyn Executor>) -> Vec<Processed> {
    let mut processed = Vec::new();
    while let Some(identifier) = queue.next_for_execution() {
        let result = execute_claimed(&queue, &executor, identifier.clone()).await;
        processed.push((identifier, result));
    }
    processed
}

async fn execute_claimed(
    queue: &ExecutionQueue,
    executor: &Arc<dyn Executor>,
    identifier: RunIdentifier,
) -> Result<ExecutionSummary, String> {
    debug!(run = %identifier, "executing");

    let task = {
        let executor = executor.clone();
        let identifier = identifier.clone();
        tokio::task::spawn_blocking(move || executor.execute(&identifier))
    };
    let result = match task.await {
        Ok(result) => result,
        Err(e) => Err(format!("executor task failed: {e}")),
    };

    match &result {
        Ok(summary) => info!(
            run = %identifier,
            uuid = %summary.uuid,
            results = summary.results,
            failures = summary.failures,
            "run finished"
        ),
        Err(e) => warn!(run = %identifier, error = %e, "run failed"),
    }

    if let Err(e) = queue.complete(&identifier) {
        warn!(run = %identifier, error = %e, "completed run was no longer queued");
    }
    result
}
