//! Deterministic spawner for tests and demos
//!
//! Loads either run inline on the calling thread or are queued until
//! [`MockSpawner::run_pending`], which lets tests observe a handle before
//! and after its load ran.

use super::AsyncSpawner;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;

/// When a [`MockSpawner`] runs the loads handed to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockSpawnBehavior {
    /// Run each load to completion inside `spawn`
    Inline,
    /// Queue loads until [`MockSpawner::run_pending`]
    Deferred,
}

/// Spawner driven by `futures::executor` on the calling thread
///
/// Clones share one queue.
#[derive(Clone)]
pub struct MockSpawner {
    behavior: MockSpawnBehavior,
    queue: Arc<Mutex<Vec<BoxFuture<'static, ()>>>>,
}

impl std::fmt::Debug for MockSpawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSpawner")
            .field("behavior", &self.behavior)
            .field("pending", &self.pending())
            .finish()
    }
}

impl Default for MockSpawner {
    fn default() -> Self {
        Self::deferred()
    }
}

impl MockSpawner {
    pub fn with_behavior(behavior: MockSpawnBehavior) -> Self {
        Self {
            behavior,
            queue: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Runs every load inline
    pub fn blocking() -> Self {
        Self::with_behavior(MockSpawnBehavior::Inline)
    }

    /// Queues loads until [`MockSpawner::run_pending`]
    pub fn deferred() -> Self {
        Self::with_behavior(MockSpawnBehavior::Deferred)
    }

    pub fn behavior(&self) -> MockSpawnBehavior {
        self.behavior
    }

    /// Number of queued loads
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run queued loads in spawn order, including ones queued meanwhile
    ///
    /// Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            // Lock released before running so tasks may spawn again
            let batch = std::mem::take(&mut *self.queue.lock());
            if batch.is_empty() {
                return ran;
            }
            for task in batch {
                futures::executor::block_on(task);
                ran += 1;
            }
        }
    }
}

impl AsyncSpawner for MockSpawner {
    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.behavior {
            MockSpawnBehavior::Inline => futures::executor::block_on(task),
            MockSpawnBehavior::Deferred => self.queue.lock().push(Box::pin(task)),
        }
    }

    fn runtime_name(&self) -> &'static str {
        "Mock"
    }
}
