//! In-process execution queue.
//!
//! Every mutation happens under one lock, so the duplicate check and the
//! append of [`ExecutionQueue::enqueue`] are a single atomic step. The lock is
//! only held to claim or release an element, never while a run executes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::Notify;

/// Stable error codes for queue rejections.
pub mod codes {
    pub const QUEUE_DUPLICATE: &str = "QUEUE_DUPLICATE";
    pub const QUEUE_REMOVE_EXECUTING: &str = "QUEUE_REMOVE_EXECUTING";
    pub const QUEUE_NOT_FOUND: &str = "QUEUE_NOT_FOUND";
}

/// Identity of a unit of queued work. Equal identifiers are the same run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunIdentifier {
    pub source: String,
    pub git_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_nb: Option<u32>,
    pub benchmark_type: String,
}

impl RunIdentifier {
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        git_ref: impl Into<String>,
        benchmark_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            git_ref: git_ref.into(),
            pull_nb: None,
            benchmark_type: benchmark_type.into(),
        }
    }

    #[must_use]
    pub fn with_pull_nb(mut self, pull_nb: u32) -> Self {
        self.pull_nb = Some(pull_nb);
        self
    }
}

impl fmt::Display for RunIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.benchmark_type, self.source, self.git_ref)?;
        if let Some(pull_nb) = self.pull_nb {
            write!(f, " (#{pull_nb})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementState {
    Pending,
    Executing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueElement {
    pub identifier: RunIdentifier,
    pub state: ElementState,
    pub enqueued_at: DateTime<Utc>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Run {0} is already queued")]
    Duplicate(RunIdentifier),

    #[error("Run {0} is executing and cannot be removed")]
    Executing(RunIdentifier),

    #[error("Run {0} is not queued")]
    NotFound(RunIdentifier),
}

impl QueueError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Duplicate(_) => codes::QUEUE_DUPLICATE,
            Self::Executing(_) => codes::QUEUE_REMOVE_EXECUTING,
            Self::NotFound(_) => codes::QUEUE_NOT_FOUND,
        }
    }
}

/// FIFO of pending and executing runs, shared by producers and one consumer.
#[derive(Debug, Default)]
pub struct ExecutionQueue {
    elements: Mutex<Vec<QueueElement>>,
    notify: Notify,
}

impl ExecutionQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<QueueElement>> {
        self.elements.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a pending run.
    ///
    /// Rejected with [`QueueError::Duplicate`] while an equal identifier is
    /// pending or executing; the queue is left untouched in that case.
    pub fn enqueue(&self, identifier: RunIdentifier) -> Result<(), QueueError> {
        {
            let mut elements = self.lock();
            if elements.iter().any(|e| e.identifier == identifier) {
                return Err(QueueError::Duplicate(identifier));
            }
            tracing::debug!(run = %identifier, "enqueued");
            elements.push(QueueElement {
                identifier,
                state: ElementState::Pending,
                enqueued_at: Utc::now(),
            });
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Claim the oldest pending run, marking it executing.
    pub fn next_for_execution(&self) -> Option<RunIdentifier> {
        let mut elements = self.lock();
        let element = elements
            .iter_mut()
            .find(|e| e.state == ElementState::Pending)?;
        element.state = ElementState::Executing;
        tracing::debug!(run = %element.identifier, "claimed");
        Some(element.identifier.clone())
    }

    /// Wait until a pending run exists, then claim it.
    ///
    /// Cancel safe: a run is only claimed when this future completes.
    pub async fn claim_next(&self) -> RunIdentifier {
        loop {
            if let Some(identifier) = self.next_for_execution() {
                return identifier;
            }
            self.notify.notified().await;
        }
    }

    /// Drop a finished run, whatever its state.
    pub fn complete(&self, identifier: &RunIdentifier) -> Result<(), QueueError> {
        let mut elements = self.lock();
        let pos = elements
            .iter()
            .position(|e| &e.identifier == identifier)
            .ok_or_else(|| QueueError::NotFound(identifier.clone()))?;
        elements.remove(pos);
        Ok(())
    }

    /// Withdraw a run that has not started yet.
    pub fn remove(&self, identifier: &RunIdentifier) -> Result<(), QueueError> {
        let mut elements = self.lock();
        let pos = elements
            .iter()
            .position(|e| &e.identifier == identifier)
            .ok_or_else(|| QueueError::NotFound(identifier.clone()))?;
        if elements[pos].state == ElementState::Executing {
            return Err(QueueError::Executing(identifier.clone()));
        }
        elements.remove(pos);
        Ok(())
    }

    /// Pending runs in enqueue order. Executing runs are not listed.
    pub fn pending(&self) -> Vec<QueueElement> {
        self.lock()
            .iter()
            .filter(|e| e.state == ElementState::Pending)
            .cloned()
            .collect()
    }

    /// Number of elements, executing ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_executing(&self, identifier: &RunIdentifier) -> bool {
        self.lock()
            .iter()
            .any(|e| &e.identifier == identifier && e.state == ElementState::Executing)
    }
}
