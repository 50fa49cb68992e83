//! In-process stand-ins for the origin server and the store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use super::fetch::{FetchError, ForwardedHeaders, SourceFetcher, SourceResponse};
use crate::cache::{CacheKey, Thumbnail};
use crate::storage::{StoreError, ThumbnailStore};

#[derive(Clone)]
pub struct FakeResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: Bytes,
    pub body_reads: Arc<AtomicUsize>,
}

#[async_trait]
impl SourceResponse for FakeResponse {
    fn status(&self) -> u16 {
        self.status
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    async fn read_body(self: Box<Self>, limit: u64) -> Result<Bytes, FetchError> {
        self.body_reads.fetch_add(1, Ordering::SeqCst);
        if self.body.len() as u64 > limit {
            return Err(FetchError::BodyTooLarge);
        }
        Ok(self.body.clone())
    }
}

pub struct FakeFetcher {
    pub response: FakeResponse,
    pub delay: Duration,
    pub fetches: AtomicUsize,
    pub seen_headers: parking_lot::Mutex<Vec<ForwardedHeaders>>,
}

impl FakeFetcher {
    pub fn new(response: FakeResponse) -> Self {
        Self {
            response,
            delay: Duration::ZERO,
            fetches: AtomicUsize::new(0),
            seen_headers: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn image(body: Vec<u8>) -> Self {
        let len = body.len() as u64;
        Self::new(FakeResponse {
            status: 200,
            content_type: Some("image/png".to_string()),
            content_length: Some(len),
            body: Bytes::from(body),
            body_reads: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn body_reads(&self) -> usize {
        self.response.body_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceFetcher for FakeFetcher {
    async fn fetch(
        &self,
        _url: &Url,
        headers: &ForwardedHeaders,
    ) -> Result<Box<dyn SourceResponse>, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.seen_headers.lock().push(headers.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(Box::new(self.response.clone()))
    }
}

pub struct FailingStore;

#[async_trait]
impl ThumbnailStore for FailingStore {
    async fn list_keys(&self) -> Result<Vec<CacheKey>, StoreError> {
        Ok(Vec::new())
    }

    async fn get(&self, key: &CacheKey) -> Result<Thumbnail, StoreError> {
        Err(StoreError::NotFound(key.clone()))
    }

    async fn set(&self, _thumbnail: &Thumbnail, _key: &CacheKey) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only",
        )))
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), StoreError> {
        Err(StoreError::NotFound(key.clone()))
    }
}
