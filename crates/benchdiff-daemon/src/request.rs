//! Inbound run requests.

use crate::queue::{ExecutionQueue, QueueError, RunIdentifier};
use benchdiff_core::{Config, RevisionProvider};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A request to benchmark one revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub source: String,
    #[serde(default)]
    pub git_ref: Option<String>,
    #[serde(default)]
    pub pull_nb: Option<u32>,
    pub benchmark_type: String,
}

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("missing argument: {0}")]
    Missing(&'static str),

    #[error("unknown benchmark type: {0}")]
    UnknownType(String),

    #[error("revision lookup failed: {0}")]
    Provider(String),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl RunRequest {
    /// Validate the request and resolve it to a concrete identifier.
    ///
    /// A pull request resolves to its head commit; otherwise `git_ref` is
    /// resolved through `provider`. The type is matched case-insensitively and
    /// normalised to lowercase.
    pub fn resolve(
        &self,
        config: &Config,
        provider: &dyn RevisionProvider,
    ) -> Result<RunIdentifier, RequestError> {
        if self.source.trim().is_empty() {
            return Err(RequestError::Missing("source"));
        }
        if self.benchmark_type.trim().is_empty() {
            return Err(RequestError::Missing("type"));
        }
        if !config.accepts_type(&self.benchmark_type) {
            return Err(RequestError::UnknownType(self.benchmark_type.to_uppercase()));
        }

        let git_ref = match (self.pull_nb, self.git_ref.as_deref()) {
            (Some(number), _) => {
                provider
                    .pull_request(number)
                    .map_err(RequestError::Provider)?
                    .head
            }
            (None, Some(name)) if !name.trim().is_empty() => provider
                .resolve_ref(name.trim())
                .map_err(RequestError::Provider)?,
            (None, _) => return Err(RequestError::Missing("git_ref")),
        };

        Ok(RunIdentifier {
            source: self.source.trim().to_string(),
            git_ref,
            pull_nb: self.pull_nb,
            benchmark_type: self.benchmark_type.to_lowercase(),
        })
    }
}

/// Resolve `request` and add it to `queue`.
///
/// Rejections are logged and returned; nothing is retried.
pub fn submit(
    queue: &ExecutionQueue,
    config: &Config,
    provider: &dyn RevisionProvider,
    request: &RunRequest,
) -> Result<RunIdentifier, RequestError> {
    let result = request
        .resolve(config, provider)
        .and_then(|identifier| {
            queue.enqueue(identifier.clone())?;
            Ok(identifier)
        });

    match &result {
        Ok(identifier) => tracing::info!(run = %identifier, "run queued"),
        Err(RequestError::Queue(err)) => {
            tracing::warn!(code = err.code(), error = %err, "run rejected");
        }
        Err(err) => tracing::warn!(error = %err, "invalid run request"),
    }
    result
}
