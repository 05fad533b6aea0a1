//! Texture loading and processing

use crate::gpu::ResourceId;
use image::ImageFormat;
use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;

/// Error type for texture loading operations
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Image decoding error: {0}")]
    DecodeError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Pixel layout of the texture data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8,
}

/// Color space the sampler should interpret the texels in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpace {
    #[default]
    Linear,
    Srgb,
}

/// A texture bound to materials
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    /// GPU identity
    pub id: ResourceId,
    /// Lookup name; textures loaded by URL carry the URL here
    pub name: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub data: Vec<u8>,
    pub color_space: ColorSpace,
    /// Anisotropic filtering level (1 = off)
    pub anisotropy: u8,
    pub generate_mipmaps: bool,
    /// Bumped whenever sampler state changes and needs re-upload
    pub version: u32,
}

impl Texture {
    /// Create an RGBA8 texture with default sampler state
    pub fn new(name: Option<String>, width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            id: ResourceId::next(),
            name,
            width,
            height,
            format: TextureFormat::Rgba8,
            data,
            color_space: ColorSpace::Linear,
            anisotropy: 1,
            generate_mipmaps: false,
            version: 0,
        }
    }

    /// Wrap into the shared form referenced by materials
    pub fn into_shared(self) -> TextureRef {
        Arc::new(RwLock::new(self))
    }
}

/// Shared, mutable texture reference
pub type TextureRef = Arc<RwLock<Texture>>;

/// Loads and processes texture files
#[derive(Debug, Default, Clone)]
pub struct TextureLoader;

impl TextureLoader {
    /// Create a new texture loader
    pub fn new() -> Self {
        Self
    }

    /// Load a texture from binary data
    pub fn load(&self, data: &[u8], name: Option<String>) -> Result<Texture, TextureError> {
        let format =
            image::guess_format(data).map_err(|e| TextureError::DecodeError(e.to_string()))?;

        match format {
            ImageFormat::Jpeg | ImageFormat::Png => {}
            _ => {
                return Err(TextureError::UnsupportedFormat(format!(
                    "Only JPG/JPEG and PNG formats are supported, got {:?}",
                    format.extensions_str()
                )))
            }
        }

        let img = image::load_from_memory_with_format(data, format)
            .map_err(|e| TextureError::DecodeError(e.to_string()))?;

        let rgba_img = img.into_rgba8();
        let (width, height) = rgba_img.dimensions();

        Ok(Texture::new(name, width, height, rgba_img.into_raw()))
    }
}
