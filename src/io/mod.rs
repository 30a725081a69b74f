// src/io/mod.rs

//! Per-attempt I/O pipeline.
//!
//! - [`log_path`] builds the per-attempt log file name.
//! - `sink` holds the buffered log/stdout writers shared with the output pumps.
//! - `script` materializes an inline script body as a temporary file.
//!
//! [`AttemptIo`] bundles whichever of these a step needs. It is created by
//! `Node::setup` and consumed by `Node::teardown`.

pub mod log_path;
pub(crate) mod script;
pub(crate) mod sink;

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::Step;
use crate::errors::NodeError;

use script::ScriptFile;
use sink::{SharedSink, Sink};

pub use log_path::{log_file_path, sanitize_filename};

#[derive(Default)]
pub(crate) struct AttemptIo {
    pub(crate) log: Option<SharedSink>,
    pub(crate) stdout: Option<SharedSink>,
    pub(crate) script: Option<ScriptFile>,
}

impl AttemptIo {
    /// Open the sinks `step` asks for. `log` is the attempt's log file path.
    ///
    /// Anything opened before a failure is dropped again, which closes the
    /// files and deletes a created script.
    pub(crate) async fn open(step: &Step, log: Option<&Path>) -> Result<Self, NodeError> {
        let mut io = AttemptIo::default();

        if let Some(path) = log {
            let sink = Sink::open(path)
                .await
                .map_err(|e| NodeError::setup("log file", path, e))?;
            io.log = Some(sink.shared());
        }

        if let Some(path) = stdout_path(step) {
            let sink = Sink::open(&path)
                .await
                .map_err(|e| NodeError::setup("stdout file", &path, e))?;
            io.stdout = Some(sink.shared());
        }

        if let Some(ref body) = step.script {
            let dir = step.dir.as_deref();
            let script = ScriptFile::create(dir, body).map_err(|e| {
                NodeError::setup("script file", dir.unwrap_or_else(|| Path::new("")), e)
            })?;
            debug!(step = %step.name, path = ?script.path(), "wrote script file");
            io.script = Some(script);
        }

        Ok(io)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.log.is_none() && self.stdout.is_none() && self.script.is_none()
    }

    pub(crate) fn script_path(&self) -> Option<PathBuf> {
        self.script.as_ref().map(|s| s.path().to_path_buf())
    }

    /// Flush and close every handle, then delete the script.
    ///
    /// Every close is attempted even after a failure; the last failure is
    /// returned.
    pub(crate) async fn teardown(self) -> Result<(), NodeError> {
        let mut last = Ok(());

        for (context, sink) in [
            ("closing log file", self.log),
            ("closing stdout file", self.stdout),
        ] {
            let Some(sink) = sink else { continue };
            let mut sink = sink.lock().await;
            if let Err(e) = sink.close().await {
                warn!(path = ?sink.path(), error = %e, "{context} failed");
                last = Err(NodeError::io(context, e));
            }
        }

        if let Some(script) = self.script {
            let path = script.path().to_path_buf();
            if let Err(e) = script.remove() {
                warn!(path = ?path, error = %e, "removing script file failed");
            }
        }

        last
    }
}

/// Stdout file of `step`, resolved against its working directory.
fn stdout_path(step: &Step) -> Option<PathBuf> {
    let path = step.stdout.as_ref()?;
    if path.as_os_str().is_empty() {
        return None;
    }
    match step.dir {
        Some(ref dir) if !path.is_absolute() => Some(dir.join(path)),
        _ => Some(path.clone()),
    }
}
