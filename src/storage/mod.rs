mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::cache::{CacheKey, Thumbnail};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Thumbnail {0} not found in storage")]
    NotFound(CacheKey),

    #[error("Stored thumbnail {0} is not a valid JPEG")]
    Corrupt(CacheKey),
}

/// Durable home of encoded thumbnails, keyed the same way as the in-memory cache.
#[async_trait]
pub trait ThumbnailStore: Send + Sync {
    /// Keys of every stored thumbnail, oldest first.
    async fn list_keys(&self) -> Result<Vec<CacheKey>, StoreError>;

    async fn get(&self, key: &CacheKey) -> Result<Thumbnail, StoreError>;

    async fn set(&self, thumbnail: &Thumbnail, key: &CacheKey) -> Result<(), StoreError>;

    async fn delete(&self, key: &CacheKey) -> Result<(), StoreError>;
}
