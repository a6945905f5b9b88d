use crate::reduce::Grouping;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for benchdiff operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    ConfigInvalid(String),

    #[error("Cannot compare results grouped by {left} with results grouped by {right}")]
    GroupingMismatch { left: Grouping, right: Grouping },

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Other(String),
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// The codebase could not be loaded. Discovery produces nothing in this case.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Codebase root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// A single benchmark invocation failed to start or exited non-zero.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with code {code}")]
    Exit {
        command: String,
        code: i32,
        /// Tail of the captured stderr.
        stderr: String,
    },
}

impl RunError {
    /// Captured stderr of a non-zero exit, if the tool wrote any.
    #[must_use]
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Exit { stderr, .. } if !stderr.trim().is_empty() => Some(stderr),
            _ => None,
        }
    }
}

/// Errors surfaced by a [`crate::store::ResultStore`] backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("No results stored for {0}")]
    NotFound(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}
