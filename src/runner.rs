// src/runner.rs

//! Driving one node through its lifecycle, with retries.
//!
//! This is the smallest driver that exercises everything a node offers:
//! precondition checks, status transitions, retry and done counters. DAG
//! ordering is left to callers.

use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{Condition, Step};
use crate::exec::env::expand_env;
use crate::node::{Node, NodeIds};
use crate::types::NodeStatus;

/// Values shared by every node of one run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub log_dir: PathBuf,
    pub request_id: String,
    /// Tripped when the run is interrupted. No new attempt starts afterwards.
    pub interrupt: CancellationToken,
}

/// First precondition of `step` that does not hold, if any.
pub fn unmet_precondition(step: &Step) -> Option<&Condition> {
    step.preconditions
        .iter()
        .find(|c| expand_env(&c.condition) != c.expected)
}

/// Run `node` to a terminal status and return it.
///
/// A failed attempt is retried up to `step.retry.limit` times. A canceled
/// attempt is never retried, and neither is any attempt once
/// `ctx.interrupt` has fired, including while waiting out the interval.
pub async fn run_node(node: &Node, ids: &NodeIds, ctx: &RunContext) -> NodeStatus {
    let id = node.init(ids);

    if let Some(cond) = unmet_precondition(node.step()) {
        info!(
            node = %node.name(),
            node_id = id,
            condition = %cond.condition,
            expected = %cond.expected,
            "precondition not met; skipping"
        );
        node.set_status(NodeStatus::Skipped);
        return node.status();
    }

    loop {
        let status = run_attempt(node, ctx).await;
        let retry = node.step().retry;

        if status == NodeStatus::Error && node.retry_count() < retry.limit {
            if ctx.interrupt.is_cancelled() {
                info!(node = %node.name(), node_id = id, "run interrupted; not retrying");
                return status;
            }
            warn!(
                node = %node.name(),
                node_id = id,
                attempt = node.retry_count() + 1,
                limit = retry.limit,
                "node failed; scheduling retry"
            );
            if retry.interval_ms > 0 {
                tokio::select! {
                    _ = ctx.interrupt.cancelled() => {
                        info!(node = %node.name(), node_id = id, "run interrupted while waiting to retry");
                        return status;
                    }
                    _ = tokio::time::sleep(Duration::from_millis(retry.interval_ms)) => {}
                }
            }
            node.inc_retry_count();
            node.clear_state();
            continue;
        }

        info!(node = %node.name(), node_id = id, status = %status, "node finished");
        return status;
    }
}

async fn run_attempt(node: &Node, ctx: &RunContext) -> NodeStatus {
    node.set_status(NodeStatus::Running);
    // An interrupt that raced the status change found nothing to signal.
    if ctx.interrupt.is_cancelled() {
        node.cancel();
    }

    if node.setup(&ctx.log_dir, &ctx.request_id).await.is_ok() {
        let status = match node.execute().await {
            Ok(()) => NodeStatus::Success,
            Err(_) => NodeStatus::Error,
        };
        node.set_status(status);
    }

    if let Err(e) = node.teardown().await {
        warn!(node = %node.name(), error = %e, "teardown failed");
    }
    node.inc_done_count();
    node.status()
}
