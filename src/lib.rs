// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod io;
pub mod logging;
pub mod node;
pub mod runner;
pub mod summary;
pub mod types;

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, Step, load_and_validate};
use crate::errors::DagnodeError;
use crate::node::{Node, NodeIds};
use crate::runner::{RunContext, run_node};
use crate::types::NodeStatus;

pub use crate::errors::NodeError;
pub use crate::node::NodeSnapshot;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - one node per selected step, run one after another
/// - Ctrl-C handling (SIGTERM to the running node's process group)
/// - the end-of-run summary
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)
        .with_context(|| format!("loading config {:?}", args.config))?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let steps: Vec<Step> = match args.step {
        Some(ref name) => vec![
            cfg.step_by_name(name)
                .cloned()
                .ok_or_else(|| DagnodeError::StepNotFound(name.clone()))?,
        ],
        None => cfg.step.clone(),
    };

    let interrupt = CancellationToken::new();
    let ctx = RunContext {
        log_dir: args.log_dir.clone().unwrap_or_else(|| cfg.run.log_dir.clone()),
        request_id: args
            .request_id
            .clone()
            .or_else(|| cfg.run.request_id.clone())
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string()),
        interrupt: interrupt.clone(),
    };
    info!(request_id = %ctx.request_id, log_dir = ?ctx.log_dir, steps = steps.len(), "starting run");

    let nodes: Vec<Arc<Node>> = steps.into_iter().map(|s| Arc::new(Node::new(s))).collect();
    let current: Arc<Mutex<Option<Arc<Node>>>> = Arc::new(Mutex::new(None));

    // Ctrl-C → SIGTERM to whatever is running, and stop afterwards.
    {
        let current = Arc::clone(&current);
        let interrupt = interrupt.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    eprintln!("failed to listen for Ctrl+C: {e}");
                    return;
                }
                interrupt.cancel();
                let node = current.lock().ok().and_then(|g| g.clone());
                if let Some(node) = node {
                    warn!(node = %node.name(), "interrupt received; stopping node");
                    node.signal(exec::signal::SIGTERM);
                }
            }
        });
    }

    let ids = NodeIds::new();
    let mut failed: Option<(String, NodeStatus)> = None;

    for node in nodes.iter() {
        if interrupt.is_cancelled() {
            debug!(node = %node.name(), "run interrupted; not starting node");
            break;
        }
        if let Ok(mut slot) = current.lock() {
            *slot = Some(Arc::clone(node));
        }

        let status = run_node(node, &ids, &ctx).await;

        if let Ok(mut slot) = current.lock() {
            *slot = None;
        }
        if !matches!(status, NodeStatus::Success | NodeStatus::Skipped) {
            failed = Some((node.name().to_string(), status));
            break;
        }
    }

    let snapshots: Vec<NodeSnapshot> = nodes.iter().map(|n| n.snapshot()).collect();
    info!("summary\n{}", summary::render_table(&snapshots));

    match failed {
        Some((name, status)) => anyhow::bail!("step '{name}' {status}"),
        None if interrupt.is_cancelled() => anyhow::bail!("run interrupted"),
        None => Ok(()),
    }
}

/// Simple dry-run output: print steps and what they would run.
fn print_dry_run(cfg: &ConfigFile) {
    println!("dagnode dry-run");
    println!("  run.log_dir = {:?}", cfg.run.log_dir);
    if let Some(ref id) = cfg.run.request_id {
        println!("  run.request_id = {id}");
    }
    println!();

    println!("steps ({}):", cfg.step.len());
    for step in cfg.step.iter() {
        println!("  - {}", step.name);
        println!("      command: {}", step.command_text());
        if step.script.is_some() {
            println!("      script: inline");
        }
        if let Some(ref dir) = step.dir {
            println!("      dir: {dir:?}");
        }
        if let Some(ref stdout) = step.stdout {
            println!("      stdout: {stdout:?}");
        }
        if let Some(ref output) = step.output {
            println!("      output: {output}");
        }
        if !step.preconditions.is_empty() {
            println!("      preconditions: {}", step.preconditions.len());
        }
        if step.retry.limit > 0 {
            println!("      retry: {} (every {}ms)", step.retry.limit, step.retry.interval_ms);
        }
        if step.mail_on_error {
            println!("      mail_on_error: true");
        }
    }

    debug!("dry-run complete (no execution)");
}
