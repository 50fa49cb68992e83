use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, error, info};
use parking_lot::Mutex;
use url::Url;

use super::fetch::{ForwardedHeaders, SourceFetcher};
use super::tools::{self, ResizeParams};
use super::PreviewError;
use crate::cache::{CacheKey, Operation, Thumbnail, ThumbnailCache};
use crate::storage::ThumbnailStore;

type Pending = Shared<BoxFuture<'static, Result<Thumbnail, PreviewError>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Largest accepted source image, in KB.
    pub max_image_size: u64,
    pub jpeg_quality: u8,
    pub reject_upscale: bool,
}

/// Cache-aside thumbnail pipeline: cache lookup, then fetch, validate,
/// resize, cache and persist on a miss.
///
/// Concurrent misses on one key share a single pending production, so they
/// all see the same thumbnail or the same error.
pub struct PreviewService {
    pipeline: Pipeline,
    inflight: Mutex<HashMap<CacheKey, Pending>>,
}

#[derive(Clone)]
struct Pipeline {
    cache: Arc<dyn ThumbnailCache>,
    store: Arc<dyn ThumbnailStore>,
    fetcher: Arc<dyn SourceFetcher>,
    options: ServiceOptions,
}

struct Job {
    key: CacheKey,
    width: u32,
    height: u32,
    source: Url,
    headers: ForwardedHeaders,
}

impl PreviewService {
    pub fn new(
        cache: Arc<dyn ThumbnailCache>,
        store: Arc<dyn ThumbnailStore>,
        fetcher: Arc<dyn SourceFetcher>,
        options: ServiceOptions,
    ) -> Self {
        Self {
            pipeline: Pipeline {
                cache,
                store,
                fetcher,
                options,
            },
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub async fn resolve(
        &self,
        width: u32,
        height: u32,
        source: &Url,
        headers: &ForwardedHeaders,
    ) -> Result<Thumbnail, PreviewError> {
        let key = CacheKey::derive(Operation::Fill, width, height, source.as_str());

        if let Some(thumbnail) = self.pipeline.cache.get(&key) {
            info!("Thumbnail {} served from cache", key);
            return Ok(thumbnail);
        }

        let pending = {
            let mut inflight = self.inflight.lock();
            match inflight.get(&key) {
                Some(pending) => {
                    debug!("Thumbnail {} already being produced, waiting", key);
                    pending.clone()
                }
                None => {
                    // A production may have finished between the lookup above and this lock
                    if let Some(thumbnail) = self.pipeline.cache.get(&key) {
                        return Ok(thumbnail);
                    }

                    let job = Job {
                        key: key.clone(),
                        width,
                        height,
                        source: source.clone(),
                        headers: headers.clone(),
                    };
                    let pending = self.pipeline.clone().run(job).boxed().shared();
                    inflight.insert(key.clone(), pending.clone());
                    pending
                }
            }
        };

        let result = pending.clone().await;

        let mut inflight = self.inflight.lock();
        if inflight.get(&key).map_or(false, |p| p.ptr_eq(&pending)) {
            inflight.remove(&key);
        }

        result
    }
}

impl Pipeline {
    async fn run(self, job: Job) -> Result<Thumbnail, PreviewError> {
        info!("Thumbnail {} not cached, fetching {}", job.key, job.source);
        let thumbnail = self.produce(&job).await?;

        self.cache.set(job.key.clone(), thumbnail.clone());

        if let Err(e) = self.store.set(&thumbnail, &job.key).await {
            error!("Failed to persist thumbnail {}: {}", job.key, e);
            return Err(PreviewError::PersistFailed(Arc::new(e)));
        }

        Ok(thumbnail)
    }

    async fn produce(&self, job: &Job) -> Result<Thumbnail, PreviewError> {
        let limit_kb = self.options.max_image_size;
        let limit_bytes = limit_kb.saturating_mul(1024);

        let response = self
            .fetcher
            .fetch(&job.source, &job.headers)
            .await
            .map_err(|e| PreviewError::from_fetch(e, limit_kb))?;

        let status = response.status();
        if !(200..300).contains(&status) {
            return Err(PreviewError::ImageNotFound(status));
        }

        let content_type = response.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image") {
            return Err(PreviewError::NotAnImage(content_type));
        }

        if let Some(length) = response.content_length() {
            if length > limit_bytes {
                return Err(PreviewError::ImageTooLarge { limit_kb });
            }
        }

        let body = response
            .read_body(limit_bytes)
            .await
            .map_err(|e| PreviewError::from_fetch(e, limit_kb))?;
        debug!("Downloaded {} bytes from {}", body.len(), job.source);

        let params = ResizeParams {
            width: job.width,
            height: job.height,
            quality: self.options.jpeg_quality,
            reject_upscale: self.options.reject_upscale,
        };

        let encoded = tokio::task::spawn_blocking(move || tools::make_thumbnail(&body, &params))
            .await
            .map_err(|e| PreviewError::ResizeFailed(format!("Resize task failed: {}", e)))??;

        Ok(Thumbnail::new(encoded))
    }
}
