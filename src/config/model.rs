// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [run]
/// log_dir = "logs"
///
/// [[step]]
/// name = "greet"
/// cmd = "echo hello"
/// output = "GREETING"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub run: RunSection,

    /// Steps in declaration order.
    #[serde(default)]
    pub step: Vec<Step>,
}

/// Validated configuration. Construct via `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub run: RunSection,
    pub step: Vec<Step>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(run: RunSection, step: Vec<Step>) -> Self {
        Self { run, step }
    }

    pub fn step_by_name(&self, name: &str) -> Option<&Step> {
        self.step.iter().find(|s| s.name == name)
    }
}

/// `[run]` section: values supplied once per execution run.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSection {
    /// Root directory for per-attempt log files.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Identifier of this run. Generated when absent.
    #[serde(default)]
    pub request_id: Option<String>,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            request_id: None,
        }
    }
}

/// Immutable description of what a node runs.
///
/// A step either has an unsplit command line (`cmd`), or a pre-split
/// `command` + `args`, optionally with an inline `script` whose temporary file
/// path is appended to the arguments.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Step {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Unsplit command line, env-expanded and split right before execution.
    #[serde(default)]
    pub cmd: Option<String>,

    #[serde(default)]
    pub command: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory of the process. Also where the script file and a
    /// relative `stdout` path live.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Extra environment variables merged into the inherited environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub script: Option<String>,

    /// File that receives a copy of the process stdout.
    #[serde(default)]
    pub stdout: Option<PathBuf>,

    /// Name of the environment variable that receives the trimmed stdout.
    #[serde(default)]
    pub output: Option<String>,

    #[serde(default)]
    pub preconditions: Vec<Condition>,

    #[serde(default)]
    pub mail_on_error: bool,

    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Step {
    /// Command line as shown in status tables.
    pub fn command_text(&self) -> String {
        if let Some(ref cmd) = self.cmd {
            return cmd.clone();
        }
        let mut parts: Vec<&str> = Vec::with_capacity(self.args.len() + 1);
        if let Some(ref command) = self.command {
            parts.push(command);
        }
        parts.extend(self.args.iter().map(String::as_str));
        parts.join(" ")
    }
}

/// A condition gating whether a step runs.
///
/// `condition` is env-expanded and compared verbatim with `expected`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Condition {
    pub condition: String,
    pub expected: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure.
    #[serde(default)]
    pub limit: u32,

    /// Pause between attempts, in milliseconds.
    #[serde(default)]
    pub interval_ms: u64,
}
