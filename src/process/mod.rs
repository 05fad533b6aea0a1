//! Model processing passes run around the cache lifecycle
//!
//! `optimize` runs once after decoding, `dispose` once when a model leaves
//! the cache or is dropped by its owner.

pub mod dispose;
pub mod optimize;

pub use dispose::{dispose_model, dispose_texture, DisposalReport};
pub use optimize::{optimize_model, TEXTURE_ANISOTROPY};
