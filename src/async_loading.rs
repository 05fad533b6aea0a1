//! Observable state of background model loads
//!
//! UI components poll an [`AsyncModelHandle`] to decide between a loading
//! indicator, the model, or a textual error in its place.

use crate::ModelHandle;
use parking_lot::RwLock as SyncRwLock;
use std::sync::Arc;
use thiserror::Error;

/// Error type for background loading operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AsyncAssetError {
    #[error("Model not found")]
    NotFound,

    #[error("Asset loading failed: {0}")]
    LoadingFailed(String),

    #[error("Asset loading has not finished")]
    NotReady,
}

/// Represents the current state of a background model load
#[derive(Debug, Clone)]
pub enum LoadState {
    /// Loading has not started yet
    Pending,

    /// Fetch in progress (0.0 to 1.0)
    Loading(f32),

    /// Loading completed successfully
    Completed(ModelHandle),

    /// Loading failed with an error message
    Failed(String),

    /// The requested model id is unknown
    NotFound,
}

impl PartialEq for LoadState {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Pending, Self::Pending) | (Self::NotFound, Self::NotFound) => true,
            (Self::Loading(a), Self::Loading(b)) => a == b,
            (Self::Completed(a), Self::Completed(b)) => a.ptr_eq(b),
            (Self::Failed(a), Self::Failed(b)) => a == b,
            _ => false,
        }
    }
}

/// Handle to a model loading in the background
#[derive(Debug, Clone)]
pub struct AsyncModelHandle {
    /// URL or catalog id that was requested
    pub request: String,
    state: Arc<SyncRwLock<LoadState>>,
}

impl AsyncModelHandle {
    /// Create a new pending handle
    pub fn new(request: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            state: Arc::new(SyncRwLock::new(LoadState::Pending)),
        }
    }

    /// Get the current load state
    pub fn state(&self) -> LoadState {
        self.state.read().clone()
    }

    /// Check if loading is complete
    pub fn is_ready(&self) -> bool {
        matches!(*self.state.read(), LoadState::Completed(_))
    }

    /// Check if loading failed or the request was unknown
    pub fn is_failed(&self) -> bool {
        matches!(*self.state.read(), LoadState::Failed(_) | LoadState::NotFound)
    }

    /// Check if loading is still in progress
    pub fn is_loading(&self) -> bool {
        matches!(*self.state.read(), LoadState::Pending | LoadState::Loading(_))
    }

    /// Get the loading progress (0.0 to 1.0)
    pub fn progress(&self) -> f32 {
        match &*self.state.read() {
            LoadState::Pending => 0.0,
            LoadState::Loading(p) => *p,
            LoadState::Completed(_) => 1.0,
            LoadState::Failed(_) | LoadState::NotFound => 0.0,
        }
    }

    /// Get the loaded model if loading is complete
    pub fn model(&self) -> Option<ModelHandle> {
        match &*self.state.read() {
            LoadState::Completed(model) => Some(model.clone()),
            _ => None,
        }
    }

    /// The outcome as a result, for callers that prefer `?`
    pub fn result(&self) -> Result<ModelHandle, AsyncAssetError> {
        match &*self.state.read() {
            LoadState::Completed(model) => Ok(model.clone()),
            LoadState::Failed(message) => Err(AsyncAssetError::LoadingFailed(message.clone())),
            LoadState::NotFound => Err(AsyncAssetError::NotFound),
            LoadState::Pending | LoadState::Loading(_) => Err(AsyncAssetError::NotReady),
        }
    }

    /// Text to show in place of the model, if any
    pub fn status_text(&self) -> Option<String> {
        match &*self.state.read() {
            LoadState::Pending | LoadState::Loading(_) => Some("Loading...".to_string()),
            LoadState::Failed(message) => Some(format!("Error: {message}")),
            LoadState::NotFound => Some(format!("Error: {}", AsyncAssetError::NotFound)),
            LoadState::Completed(_) => None,
        }
    }

    pub(crate) fn state_arc(&self) -> Arc<SyncRwLock<LoadState>> {
        Arc::clone(&self.state)
    }

    pub(crate) fn set_state(&self, state: LoadState) {
        *self.state.write() = state;
    }
}
