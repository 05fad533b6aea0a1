//! Byte sources the loader fetches model and texture data from

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Read size used when streaming files
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Progress callback: `(bytes_loaded, bytes_total)`
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Error type for fetch operations
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Invalid asset url: {0}")]
    InvalidUrl(String),

    #[error("Fetch failed: {0}")]
    Failed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for fetching raw asset bytes by URL
///
/// Uses async-trait for dyn compatibility
#[async_trait::async_trait]
pub trait AssetSource: Send + Sync {
    /// Fetch the full contents behind `url`, reporting progress as it goes
    async fn fetch(
        &self,
        url: &str,
        progress: Option<&ProgressCallback>,
    ) -> Result<Vec<u8>, SourceError>;
}

/// Serves URLs from a directory on disk
///
/// `/models/bag.glb` resolves to `<root>/models/bag.glb`. With the
/// `runtime-tokio` feature, reads go through `tokio::fs` when polled inside a
/// Tokio runtime and fall back to blocking `std::fs` reads otherwise.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    /// Create a new file source rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a URL onto a path below the root
    pub fn resolve(&self, url: &str) -> Result<PathBuf, SourceError> {
        let relative = Path::new(url.trim_start_matches('/'));
        let mut path = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => return Err(SourceError::InvalidUrl(url.to_string())),
            }
        }
        Ok(path)
    }
}

#[async_trait::async_trait]
impl AssetSource for FileSource {
    async fn fetch(
        &self,
        url: &str,
        progress: Option<&ProgressCallback>,
    ) -> Result<Vec<u8>, SourceError> {
        let path = self.resolve(url)?;
        if !path.is_file() {
            return Err(SourceError::NotFound(url.to_string()));
        }
        #[cfg(feature = "runtime-tokio")]
        let data = if tokio::runtime::Handle::try_current().is_ok() {
            read_chunked_async(&path, progress).await
        } else {
            read_chunked(&path, progress)
        };
        #[cfg(not(feature = "runtime-tokio"))]
        let data = read_chunked(&path, progress);
        data
    }
}

#[cfg(feature = "runtime-tokio")]
async fn read_chunked_async(path: &Path, progress: Option<&ProgressCallback>) -> Result<Vec<u8>, SourceError> {
    use tokio::io::AsyncReadExt;

    let mut file = tokio::fs::File::open(path).await?;
    let total = file.metadata().await?.len();
    let mut data = Vec::with_capacity(total as usize);
    let mut chunk = vec![0u8; CHUNK_SIZE];

    loop {
        let read = file.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        data.extend_from_slice(&chunk[..read]);
        if let Some(progress) = progress {
            progress(data.len() as u64, total);
        }
    }
    Ok(data)
}

fn read_chunked(path: &Path, progress: Option<&ProgressCallback>) -> Result<Vec<u8>, SourceError> {
    use std::io::Read;

    let mut file = std::fs::File::open(path)?;
    let total = file.metadata()?.len();
    let mut data = Vec::with_capacity(total as usize);
    let mut chunk = vec![0u8; CHUNK_SIZE];

    loop {
        let read = file.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        data.extend_from_slice(&chunk[..read]);
        if let Some(progress) = progress {
            progress(data.len() as u64, total);
        }
    }
    Ok(data)
}

/// In-memory URL table
///
/// Counts fetches per URL and can be told to fail specific URLs, which makes
/// it the source of choice for tests and demos.
#[derive(Debug, Default)]
pub struct MemorySource {
    assets: RwLock<HashMap<String, Arc<Vec<u8>>>>,
    failing: RwLock<HashSet<String>>,
    fetches: RwLock<HashMap<String, usize>>,
    chunk_size: usize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            ..Self::default()
        }
    }

    /// Report progress in steps of `chunk_size` bytes
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Serve `bytes` under `url`
    pub fn insert(&self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.assets.write().insert(url.into(), Arc::new(bytes.into()));
    }

    /// Make every fetch of `url` fail until [`MemorySource::restore`]
    pub fn fail(&self, url: impl Into<String>) {
        self.failing.write().insert(url.into());
    }

    pub fn restore(&self, url: &str) {
        self.failing.write().remove(url);
    }

    /// Number of fetches issued for `url`, failed ones included
    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches.read().get(url).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.read().values().sum()
    }
}

#[async_trait::async_trait]
impl AssetSource for MemorySource {
    async fn fetch(
        &self,
        url: &str,
        progress: Option<&ProgressCallback>,
    ) -> Result<Vec<u8>, SourceError> {
        *self.fetches.write().entry(url.to_string()).or_insert(0) += 1;

        if self.failing.read().contains(url) {
            return Err(SourceError::Failed(format!("simulated failure for {url}")));
        }
        let bytes = self
            .assets
            .read()
            .get(url)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(url.to_string()))?;

        if let Some(progress) = progress {
            let total = bytes.len() as u64;
            let step = self.chunk_size.max(1);
            let mut loaded = 0usize;
            while loaded < bytes.len() {
                loaded = (loaded + step).min(bytes.len());
                progress(loaded as u64, total);
            }
        }
        Ok(bytes.as_ref().clone())
    }
}
