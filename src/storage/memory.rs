use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{StoreError, ThumbnailStore};
use crate::cache::{CacheKey, Thumbnail};

/// Map-backed store. Keys are listed in the order they were first written.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    order: Vec<CacheKey>,
    thumbnails: HashMap<CacheKey, Thumbnail>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().thumbnails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ThumbnailStore for MemoryStore {
    async fn list_keys(&self) -> Result<Vec<CacheKey>, StoreError> {
        Ok(self.inner.read().order.clone())
    }

    async fn get(&self, key: &CacheKey) -> Result<Thumbnail, StoreError> {
        self.inner
            .read()
            .thumbnails
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    async fn set(&self, thumbnail: &Thumbnail, key: &CacheKey) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner
            .thumbnails
            .insert(key.clone(), thumbnail.clone())
            .is_none()
        {
            inner.order.push(key.clone());
        }
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.thumbnails.remove(key).is_none() {
            return Err(StoreError::NotFound(key.clone()));
        }
        inner.order.retain(|k| k != key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Operation;

    fn key(n: u32) -> CacheKey {
        CacheKey::derive(Operation::Fill, n, n, "https://example.com/a.jpg")
    }

    #[tokio::test]
    async fn keeps_first_write_order() {
        let store = MemoryStore::new();
        store.set(&Thumbnail::new(vec![1]), &key(2)).await.unwrap();
        store.set(&Thumbnail::new(vec![2]), &key(1)).await.unwrap();
        store.set(&Thumbnail::new(vec![3]), &key(2)).await.unwrap();

        assert_eq!(store.list_keys().await.unwrap(), vec![key(2), key(1)]);
        assert_eq!(store.get(&key(2)).await.unwrap().data().as_ref(), &[3]);
    }

    #[tokio::test]
    async fn delete_removes_key() {
        let store = MemoryStore::new();
        store.set(&Thumbnail::new(vec![1]), &key(1)).await.unwrap();
        store.delete(&key(1)).await.unwrap();

        assert!(store.is_empty());
        assert!(store.list_keys().await.unwrap().is_empty());
        assert!(matches!(store.delete(&key(1)).await, Err(StoreError::NotFound(_))));
    }
}
