// src/errors.rs

//! Crate-wide error types.
//!
//! - [`DagnodeError`] covers configuration loading and the CLI runner.
//! - [`NodeError`] is recorded on a node for a single attempt. It is `Clone`
//!   so the value returned from `execute()` is the same one stored in the
//!   node's state.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DagnodeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Step not found: {0}")]
    StepNotFound(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DagnodeError>;

/// Failure of one node attempt.
#[derive(Error, Debug, Clone)]
pub enum NodeError {
    #[error("failed to prepare {what} at {path:?}: {source}")]
    Setup {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("exit status {code}")]
    Exited { code: i32 },

    #[error("terminated by signal {signal}")]
    Signaled { signal: i32 },

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("step has no command to run")]
    EmptyCommand,

    #[error("previous attempt has not been torn down")]
    AttemptInProgress,

    #[error("canceled before the process started")]
    Canceled,
}

impl NodeError {
    pub(crate) fn setup(what: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        NodeError::Setup {
            what,
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        NodeError::Io {
            context,
            source: Arc::new(source),
        }
    }
}
