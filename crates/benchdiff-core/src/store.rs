//! Result persistence contract and an in-memory backend.

use crate::compare::{compare, ComparisonEntry};
use crate::error::{Error, StoreError};
use crate::reduce::{Grouping, ReducedResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// Lifecycle of a stored execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Started,
    Finished,
    Failed,
}

impl ExecutionStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Finished => "finished",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Bookkeeping for one execution of a queued run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub uuid: Uuid,
    pub source: String,
    pub git_ref: String,
    pub benchmark_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_nb: Option<u32>,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ExecutionRecord {
    /// A freshly started execution with a new uuid.
    #[must_use]
    pub fn started(
        source: impl Into<String>,
        git_ref: impl Into<String>,
        benchmark_type: impl Into<String>,
        pull_nb: Option<u32>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            source: source.into(),
            git_ref: git_ref.into(),
            benchmark_type: benchmark_type.into(),
            pull_nb,
            status: ExecutionStatus::Started,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Mark the execution as ended with `status`.
    #[must_use]
    pub fn finish(mut self, status: ExecutionStatus) -> Self {
        self.status = status;
        self.finished_at = Some(Utc::now());
        self
    }
}

/// Persistence for reduced results, comparisons and execution records.
pub trait ResultStore: Send + Sync {
    /// Replace the results stored for `git_ref`.
    fn save_results(&self, git_ref: &str, results: &[ReducedResult]) -> Result<(), StoreError>;

    /// Results stored for `git_ref`; empty if none were stored.
    fn load_results(&self, git_ref: &str) -> Result<Vec<ReducedResult>, StoreError>;

    fn save_comparison(
        &self,
        left_ref: &str,
        right_ref: &str,
        entries: &[ComparisonEntry],
    ) -> Result<(), StoreError>;

    /// Insert a record, or replace the one with the same uuid.
    fn record_execution(&self, record: ExecutionRecord) -> Result<(), StoreError>;

    /// All records, most recently started first.
    fn list_executions(&self) -> Result<Vec<ExecutionRecord>, StoreError>;

    /// Delete the record matching both `uuid` and `git_ref`.
    fn delete_execution(&self, uuid: &Uuid, git_ref: &str) -> Result<(), StoreError>;
}

/// Process-local [`ResultStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    results: RwLock<HashMap<String, Vec<ReducedResult>>>,
    comparisons: RwLock<HashMap<(String, String), Vec<ComparisonEntry>>>,
    executions: RwLock<Vec<ExecutionRecord>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Comparison previously saved for the pair of refs.
    ///
    /// # Errors
    /// `StoreError::NotFound` if no comparison was saved for the pair.
    pub fn load_comparison(
        &self,
        left_ref: &str,
        right_ref: &str,
    ) -> Result<Vec<ComparisonEntry>, StoreError> {
        let comparisons = self.comparisons.read().map_err(poisoned)?;
        comparisons
            .get(&(left_ref.to_string(), right_ref.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("comparison {left_ref}..{right_ref}")))
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("store lock poisoned".to_string())
}

impl ResultStore for MemoryStore {
    fn save_results(&self, git_ref: &str, results: &[ReducedResult]) -> Result<(), StoreError> {
        self.results
            .write()
            .map_err(poisoned)?
            .insert(git_ref.to_string(), results.to_vec());
        Ok(())
    }

    fn load_results(&self, git_ref: &str) -> Result<Vec<ReducedResult>, StoreError> {
        Ok(self
            .results
            .read()
            .map_err(poisoned)?
            .get(git_ref)
            .cloned()
            .unwrap_or_default())
    }

    fn save_comparison(
        &self,
        left_ref: &str,
        right_ref: &str,
        entries: &[ComparisonEntry],
    ) -> Result<(), StoreError> {
        self.comparisons
            .write()
            .map_err(poisoned)?
            .insert((left_ref.to_string(), right_ref.to_string()), entries.to_vec());
        Ok(())
    }

    fn record_execution(&self, record: ExecutionRecord) -> Result<(), StoreError> {
        let mut executions = self.executions.write().map_err(poisoned)?;
        match executions.iter_mut().find(|e| e.uuid == record.uuid) {
            Some(existing) => *existing = record,
            None => executions.push(record),
        }
        Ok(())
    }

    fn list_executions(&self) -> Result<Vec<ExecutionRecord>, StoreError> {
        let mut executions = self.executions.read().map_err(poisoned)?.clone();
        executions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(executions)
    }

    fn delete_execution(&self, uuid: &Uuid, git_ref: &str) -> Result<(), StoreError> {
        let mut executions = self.executions.write().map_err(poisoned)?;
        let before = executions.len();
        executions.retain(|e| !(e.uuid == *uuid && e.git_ref == git_ref));
        if executions.len() == before {
            return Err(StoreError::NotFound(format!("execution {uuid} at {git_ref}")));
        }
        Ok(())
    }
}

/// Compare the results stored for two refs and persist the comparison.
///
/// # Errors
/// Propagates store failures. `Error::GroupingMismatch` if one ref was
/// reduced by package and the other by name.
pub fn compare_refs(
    store: &dyn ResultStore,
    left_ref: &str,
    right_ref: &str,
) -> Result<Vec<ComparisonEntry>, Error> {
    let left = store.load_results(left_ref)?;
    let right = store.load_results(right_ref)?;
    if let (Some(l), Some(r)) = (Grouping::of_results(&left), Grouping::of_results(&right)) {
        if l != r {
            return Err(Error::GroupingMismatch { left: l, right: r });
        }
    }
    let entries = compare(&left, &right);
    store.save_comparison(left_ref, right_ref, &entries)?;

    tracing::debug!(
        left = left_ref,
        right = right_ref,
        entries = entries.len(),
        "compared refs"
    );
    Ok(entries)
}
