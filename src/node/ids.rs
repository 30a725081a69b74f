// src/node/ids.rs

use std::sync::atomic::{AtomicUsize, Ordering};

/// Hands out node ids, starting at 1.
///
/// Owned by whoever drives the nodes of one process; ids are never reused.
#[derive(Debug)]
pub struct NodeIds {
    next: AtomicUsize,
}

impl NodeIds {
    pub fn new() -> Self {
        Self {
            next: AtomicUsize::new(1),
        }
    }

    pub fn next_id(&self) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for NodeIds {
    fn default() -> Self {
        Self::new()
    }
}
