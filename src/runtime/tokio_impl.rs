//! Tokio-backed spawner

use super::AsyncSpawner;
use std::future::Future;

/// Spawns background loads as detached tasks on the current Tokio runtime
///
/// `spawn` must be called from within a runtime context.
#[derive(Clone, Debug, Default, Copy)]
pub struct TokioSpawner;

impl TokioSpawner {
    pub fn new() -> Self {
        Self
    }
}

impl AsyncSpawner for TokioSpawner {
    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // Detached: the load reports through its AsyncModelHandle
        drop(tokio::spawn(task));
    }

    fn runtime_name(&self) -> &'static str {
        "Tokio"
    }
}
