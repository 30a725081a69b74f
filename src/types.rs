// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a node.
///
/// - `NotStarted` is the only initial state and is restored only by
///   `Node::clear_state`.
/// - `Running` is set by the driver right before `Node::execute`.
/// - `Error`, `Cancel`, `Success` and `Skipped` are terminal for an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    NotStarted,
    Running,
    Error,
    Cancel,
    Success,
    Skipped,
}

impl NodeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NodeStatus::Error | NodeStatus::Cancel | NodeStatus::Success | NodeStatus::Skipped
        )
    }

    /// Human-readable label, as shown in status tables.
    pub fn label(self) -> &'static str {
        match self {
            NodeStatus::NotStarted => "not started",
            NodeStatus::Running => "running",
            NodeStatus::Error => "failed",
            NodeStatus::Cancel => "canceled",
            NodeStatus::Success => "finished",
            NodeStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for NodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "not started" => Ok(NodeStatus::NotStarted),
            "running" => Ok(NodeStatus::Running),
            "failed" => Ok(NodeStatus::Error),
            "canceled" => Ok(NodeStatus::Cancel),
            "finished" => Ok(NodeStatus::Success),
            "skipped" => Ok(NodeStatus::Skipped),
            other => Err(format!("invalid node status: {other}")),
        }
    }
}
