//! Error types for catfood_models

use thiserror::Error;

/// Main error type for model operations
#[derive(Error, Debug)]
pub enum AssetError {
    /// Fetch or decode of a model failed; nothing was cached
    #[error("Error loading model from {url}: {reason}")]
    Load { url: String, reason: String },

    #[error("Model error: {0}")]
    Model(#[from] crate::model::ModelError),

    #[error("Texture error: {0}")]
    Texture(#[from] crate::texture::TextureError),

    #[error("Source error: {0}")]
    Source(#[from] crate::loader::source::SourceError),
}

impl AssetError {
    /// Wrap an underlying failure with the URL it happened for
    pub fn load(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Load {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for model operations
pub type Result<T> = std::result::Result<T, AssetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_message_names_url_and_reason() {
        let err = AssetError::load("/models/kibble.glb", "connection reset");
        assert_eq!(
            err.to_string(),
            "Error loading model from /models/kibble.glb: connection reset"
        );
    }
}
