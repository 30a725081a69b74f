#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use dagnode::node::Node;
use dagnode::types::NodeStatus;
use dagnode::NodeError;

pub use dagnode_test_utils::builders::StepBuilder;
pub use dagnode_test_utils::{init_tracing, with_timeout};

pub const REQUEST_ID: &str = "0123456789abcdef";

/// Drive one attempt the way an orchestrator does and return the execute
/// result. The status is set from the result afterwards.
pub async fn run_once(node: &Node, log_dir: &Path) -> Result<(), NodeError> {
    node.set_status(NodeStatus::Running);
    node.setup(log_dir, REQUEST_ID).await?;
    let result = node.execute().await;
    node.set_status(if result.is_ok() {
        NodeStatus::Success
    } else {
        NodeStatus::Error
    });
    node.teardown().await.expect("teardown");
    result
}

/// Poll until `path` exists.
pub async fn wait_for_file(path: &Path) {
    with_timeout(async {
        while !path.exists() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
}
