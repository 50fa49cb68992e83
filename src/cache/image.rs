use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, info};
use parking_lot::Mutex;

use super::lru::LruCache;
use super::CacheKey;
use crate::storage::{StoreError, ThumbnailStore};

/// An encoded JPEG thumbnail, ready to be sent as a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    data: Bytes,
}

impl Thumbnail {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

#[async_trait]
pub trait ThumbnailCache: Send + Sync {
    /// Returns `true` when an existing entry was overwritten.
    fn set(&self, key: CacheKey, thumbnail: Thumbnail) -> bool;

    fn get(&self, key: &CacheKey) -> Option<Thumbnail>;

    fn clear(&self);

    fn len(&self) -> usize;

    fn capacity(&self) -> usize;

    /// Loads stored thumbnails into the cache. Returns how many were loaded.
    async fn warm(&self, store: &dyn ThumbnailStore) -> Result<usize, StoreError>;
}

// Bounded in-memory cache of resized images, shared between requests
pub struct ImageCache {
    images: Mutex<LruCache<CacheKey, Thumbnail>>,
}

impl ImageCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            images: Mutex::new(LruCache::new(capacity)),
        }
    }
}

#[async_trait]
impl ThumbnailCache for ImageCache {
    fn set(&self, key: CacheKey, thumbnail: Thumbnail) -> bool {
        let mut images = self.images.lock();
        images.set(key, thumbnail)
    }

    fn get(&self, key: &CacheKey) -> Option<Thumbnail> {
        let mut images = self.images.lock();
        images.get(key).cloned()
    }

    fn clear(&self) {
        self.images.lock().clear();
    }

    fn len(&self) -> usize {
        self.images.lock().len()
    }

    fn capacity(&self) -> usize {
        self.images.lock().capacity()
    }

    async fn warm(&self, store: &dyn ThumbnailStore) -> Result<usize, StoreError> {
        let keys = store.list_keys().await?;
        let capacity = self.capacity();

        // Only the newest `capacity` entries would survive anyway
        let skip = keys.len().saturating_sub(capacity);
        let mut loaded = 0;

        for key in keys.into_iter().skip(skip) {
            let thumbnail = store.get(&key).await?;
            debug!("Warmed cache with {}", key);
            self.set(key, thumbnail);
            loaded += 1;
        }

        info!("Cache warmed with {} stored thumbnails", loaded);
        Ok(loaded)
    }
}
