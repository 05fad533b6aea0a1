//! Where background model loads run
//!
//! [`ModelManager::load_in_background`](crate::ModelManager::load_in_background)
//! builds the whole load as one `'static` future and hands it to a spawner.
//! Progress and the outcome flow back through the returned
//! [`AsyncModelHandle`](crate::AsyncModelHandle), so spawners never return a
//! join handle of their own.

pub mod mock;
#[cfg(feature = "runtime-tokio")]
pub mod tokio_impl;

use std::fmt::Debug;
use std::future::Future;

/// Schedules background loads
pub trait AsyncSpawner: Send + Sync + Clone + Debug {
    /// Schedule a load to run to completion
    ///
    /// There is no cancellation: once scheduled, a load finishes even if
    /// nobody looks at its handle any more.
    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static;

    /// Name of the runtime, for logs
    fn runtime_name(&self) -> &'static str;
}

pub use mock::MockSpawner;

#[cfg(feature = "runtime-tokio")]
pub use tokio_impl::TokioSpawner;
