// src/node/state.rs

//! Guarded mutable state of a node.
//!
//! Every read and write of a node's status, counters, timestamps and error
//! goes through [`StateGuard`]. Nothing else holds a reference to the inner
//! `NodeState`, so no code path can touch it without taking the lock.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::debug;

use crate::errors::NodeError;
use crate::types::NodeStatus;

/// Mutable state of one node.
#[derive(Debug, Clone, Default)]
pub struct NodeState {
    pub status: NodeStatus,
    pub log: Option<PathBuf>,
    pub started_at: Option<DateTime<Local>>,
    pub finished_at: Option<DateTime<Local>>,
    pub retry_count: u32,
    pub done_count: u32,
    pub error: Option<NodeError>,
}

/// Read-only copy of a node's state, as handed to reporters.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub name: String,
    pub status: NodeStatus,
    pub log: Option<PathBuf>,
    pub started_at: Option<DateTime<Local>>,
    pub finished_at: Option<DateTime<Local>>,
    pub retry_count: u32,
    pub done_count: u32,
    pub error: Option<String>,
    pub command: String,
}

#[derive(Debug, Default)]
pub struct StateGuard {
    inner: Mutex<NodeState>,
}

impl StateGuard {
    pub fn new() -> Self {
        Self::default()
    }

    // Poisoning is ignored: every field stays valid on its own.
    fn lock(&self) -> MutexGuard<'_, NodeState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn status(&self) -> NodeStatus {
        self.lock().status
    }

    /// Set the status unless the current one is terminal.
    ///
    /// Returns whether the write took effect.
    pub fn set_status(&self, status: NodeStatus) -> bool {
        let mut state = self.lock();
        if state.status.is_terminal() {
            debug!(
                current = %state.status,
                requested = %status,
                "ignoring status change on terminal node"
            );
            return false;
        }
        state.status = status;
        true
    }

    /// Flip `Running` to `Cancel`, running `while_running` under the same lock
    /// first. Returns `false` (without calling `while_running`) when the node
    /// was not running.
    pub fn cancel_if_running(&self, while_running: impl FnOnce()) -> bool {
        let mut state = self.lock();
        if state.status != NodeStatus::Running {
            return false;
        }
        while_running();
        state.status = NodeStatus::Cancel;
        true
    }

    pub fn error(&self) -> Option<NodeError> {
        self.lock().error.clone()
    }

    pub fn set_error(&self, error: Option<NodeError>) {
        self.lock().error = error;
    }

    pub fn log(&self) -> Option<PathBuf> {
        self.lock().log.clone()
    }

    pub(crate) fn begin_attempt(&self, started_at: DateTime<Local>, log: Option<PathBuf>) {
        let mut state = self.lock();
        state.started_at = Some(started_at);
        state.finished_at = None;
        state.log = log;
    }

    pub(crate) fn mark_finished(&self, finished_at: DateTime<Local>) {
        self.lock().finished_at = Some(finished_at);
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.lock().started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Local>> {
        self.lock().finished_at
    }

    pub fn retry_count(&self) -> u32 {
        self.lock().retry_count
    }

    pub fn done_count(&self) -> u32 {
        self.lock().done_count
    }

    pub fn inc_retry_count(&self) {
        self.lock().retry_count += 1;
    }

    pub fn inc_done_count(&self) {
        self.lock().done_count += 1;
    }

    /// Return to `NotStarted` for another attempt. Counters survive.
    pub fn clear(&self) {
        let mut state = self.lock();
        let (retry_count, done_count) = (state.retry_count, state.done_count);
        *state = NodeState {
            retry_count,
            done_count,
            ..NodeState::default()
        };
    }

    /// Drop everything, counters included.
    pub fn reset(&self) {
        *self.lock() = NodeState::default();
    }

    pub fn to_state(&self) -> NodeState {
        self.lock().clone()
    }
}
