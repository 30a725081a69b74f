// src/node/mod.rs

//! A single schedulable unit: step configuration, guarded state and the
//! handles of the attempt currently in flight.
//!
//! The driver calls, in order:
//!
//! 1. [`Node::init`] once, to assign an id,
//! 2. [`Node::set_status`] with `Running`,
//! 3. [`Node::setup`], [`Node::execute`], [`Node::teardown`],
//! 4. [`Node::set_status`] with `Success` / `Error` from the result,
//! 5. optionally [`Node::clear_state`] and back to 2 for a retry.
//!
//! [`Node::cancel`] and [`Node::signal`] may be called from any thread at any
//! time; the status accessors too.

pub mod ids;
pub mod state;

use std::path::Path;
use std::sync::{Mutex, MutexGuard, OnceLock};

use chrono::Local;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::config::Step;
use crate::errors::NodeError;
use crate::exec::command;
use crate::exec::env::publish_output;
use crate::exec::process::{self, Streams};
use crate::exec::signal::signal_group;
use crate::io::{AttemptIo, log_file_path};
use crate::types::NodeStatus;

pub use ids::NodeIds;
pub use state::{NodeSnapshot, NodeState, StateGuard};

/// Process handles of the running attempt.
#[derive(Default)]
struct ProcessSlot {
    pid: Option<u32>,
    cancel: Option<oneshot::Sender<()>>,
}

pub struct Node {
    step: Step,
    id: OnceLock<usize>,
    state: StateGuard,
    io: Mutex<AttemptIo>,
    process: Mutex<ProcessSlot>,
}

impl Node {
    pub fn new(step: Step) -> Self {
        Self {
            step,
            id: OnceLock::new(),
            state: StateGuard::new(),
            io: Mutex::new(AttemptIo::default()),
            process: Mutex::new(ProcessSlot::default()),
        }
    }

    /// Assign an id from `ids` unless one is already set. Returns the id.
    pub fn init(&self, ids: &NodeIds) -> usize {
        *self.id.get_or_init(|| ids.next_id())
    }

    pub fn id(&self) -> Option<usize> {
        self.id.get().copied()
    }

    pub fn step(&self) -> &Step {
        &self.step
    }

    pub fn name(&self) -> &str {
        &self.step.name
    }

    fn io(&self) -> MutexGuard<'_, AttemptIo> {
        self.io.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn process(&self) -> MutexGuard<'_, ProcessSlot> {
        self.process.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Open the attempt's log file, stdout file and script file.
    ///
    /// On failure the error is recorded, the status becomes `Error` and
    /// nothing stays open.
    pub async fn setup(&self, log_dir: &Path, request_id: &str) -> Result<(), NodeError> {
        if !self.io().is_empty() {
            return Err(NodeError::AttemptInProgress);
        }

        let started_at = Local::now();
        let log = (!log_dir.as_os_str().is_empty())
            .then(|| log_file_path(log_dir, &self.step.name, &started_at, request_id));
        self.state.begin_attempt(started_at, log.clone());

        match AttemptIo::open(&self.step, log.as_deref()).await {
            Ok(io) => {
                debug!(node = %self.step.name, log = ?log, "attempt set up");
                *self.io() = io;
                Ok(())
            }
            Err(e) => {
                error!(node = %self.step.name, error = %e, "setup failed");
                self.state.set_error(Some(e.clone()));
                self.state.set_status(NodeStatus::Error);
                Err(e)
            }
        }
    }

    /// Run the step's process to completion and record the result.
    ///
    /// Returns once the process has exited, including after [`Node::cancel`]
    /// or [`Node::signal`] from another thread. The returned error is also
    /// stored on the node.
    pub async fn execute(&self) -> Result<(), NodeError> {
        let result = self.run_attempt().await;
        self.state.mark_finished(Local::now());
        self.state.set_error(result.clone().err());
        result
    }

    async fn run_attempt(&self) -> Result<(), NodeError> {
        let (streams, script) = {
            let io = self.io();
            let streams = Streams {
                log: io.log.clone(),
                stdout: io.stdout.clone(),
                capture: self.step.output.is_some(),
            };
            (streams, io.script_path())
        };

        let line = command::resolve(&self.step, script.as_deref())?;
        let label = std::iter::once(line.program.as_str())
            .chain(line.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        let cmd = command::build(&self.step, &line);

        let (cancel_tx, cancel_rx) = oneshot::channel();
        *self.process() = ProcessSlot {
            pid: None,
            cancel: Some(cancel_tx),
        };
        if self.state.status() == NodeStatus::Cancel {
            *self.process() = ProcessSlot::default();
            return Err(NodeError::Canceled);
        }

        info!(node = %self.step.name, command = %label, "executing node");
        let outcome = process::run_process(cmd, &label, streams, cancel_rx, |pid| {
            self.process().pid = Some(pid);
            // A signal() that landed before the pid was known sent nothing.
            if self.state.status() == NodeStatus::Cancel {
                self.cancel();
            }
        })
        .await;
        *self.process() = ProcessSlot::default();

        if let (Some(name), Some(bytes)) = (self.step.output.as_deref(), outcome.captured) {
            let value = String::from_utf8_lossy(&bytes);
            publish_output(name, value.trim());
        }

        outcome.result
    }

    /// Flush and close the attempt's files and delete its script.
    ///
    /// Returns the last close error; never changes the status.
    pub async fn teardown(&self) -> Result<(), NodeError> {
        let io = std::mem::take(&mut *self.io());
        io.teardown().await
    }

    /// Terminate the running process. A `Running` node becomes `Cancel`.
    pub fn cancel(&self) {
        self.state.cancel_if_running(|| {});
        let trigger = self.process().cancel.take();
        if let Some(trigger) = trigger {
            info!(node = %self.step.name, "canceling node");
            // The receiver is gone once the process has exited.
            let _ = trigger.send(());
        }
    }

    /// Send `sig` to the process group of a `Running` node and mark it
    /// `Cancel`. Does nothing when the node is not running.
    ///
    /// The node becomes `Cancel` even if delivery fails, e.g. because the
    /// process has already exited.
    pub fn signal(&self, sig: i32) {
        self.state.cancel_if_running(|| {
            let pid = self.process().pid;
            let Some(pid) = pid else { return };
            info!(node = %self.step.name, pid, signal = sig, "sending signal to process group");
            if let Err(e) = signal_group(pid, sig) {
                warn!(node = %self.step.name, pid, signal = sig, error = %e, "sending signal failed");
            }
        });
    }

    /// Back to `NotStarted` for another attempt; retry/done counters survive.
    pub fn clear_state(&self) {
        self.state.clear();
    }

    /// Back to a fresh state, counters included.
    pub fn reset(&self) {
        self.state.reset();
    }

    pub fn status(&self) -> NodeStatus {
        self.state.status()
    }

    /// See [`StateGuard::set_status`]: terminal states are not overwritten.
    pub fn set_status(&self, status: NodeStatus) -> bool {
        self.state.set_status(status)
    }

    pub fn error(&self) -> Option<NodeError> {
        self.state.error()
    }

    pub fn log(&self) -> Option<std::path::PathBuf> {
        self.state.log()
    }

    pub fn retry_count(&self) -> u32 {
        self.state.retry_count()
    }

    pub fn done_count(&self) -> u32 {
        self.state.done_count()
    }

    pub fn inc_retry_count(&self) {
        self.state.inc_retry_count();
    }

    pub fn inc_done_count(&self) {
        self.state.inc_done_count();
    }

    pub fn state(&self) -> NodeState {
        self.state.to_state()
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        let state = self.state.to_state();
        NodeSnapshot {
            name: self.step.name.clone(),
            status: state.status,
            log: state.log,
            started_at: state.started_at,
            finished_at: state.finished_at,
            retry_count: state.retry_count,
            done_count: state.done_count,
            error: state.error.map(|e| e.to_string()),
            command: self.step.command_text(),
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id())
            .field("name", &self.step.name)
            .field("status", &self.status())
            .finish()
    }
}
