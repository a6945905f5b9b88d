//! Source-control metadata contract.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Pull request metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestInfo {
    pub number: u32,
    pub title: String,
    pub author: String,
    /// Commit the pull request targets.
    pub base: String,
    /// Head commit of the pull request.
    pub head: String,
}

/// Resolves revisions and pull requests to commits.
pub trait RevisionProvider: Send + Sync {
    /// Commit hash for a branch, tag or commit name.
    fn resolve_ref(&self, name: &str) -> Result<String, String>;

    fn pull_request(&self, number: u32) -> Result<PullRequestInfo, String>;
}

/// Provider answering from fixed tables.
#[derive(Debug, Clone, Default)]
pub struct StaticRevisions {
    refs: HashMap<String, String>,
    pulls: HashMap<u32, PullRequestInfo>,
}

impl StaticRevisions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ref(mut self, name: impl Into<String>, commit: impl Into<String>) -> Self {
        self.refs.insert(name.into(), commit.into());
        self
    }

    #[must_use]
    pub fn with_pull_request(mut self, info: PullRequestInfo) -> Self {
        self.pulls.insert(info.number, info);
        self
    }
}

impl RevisionProvider for StaticRevisions {
    /// Unknown names resolve to themselves, so literal commit hashes pass
    /// through.
    fn resolve_ref(&self, name: &str) -> Result<String, String> {
        Ok(self
            .refs
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string()))
    }

    fn pull_request(&self, number: u32) -> Result<PullRequestInfo, String> {
        self.pulls
            .get(&number)
            .cloned()
            .ok_or_else(|| format!("unknown pull request #{number}"))
    }
}
