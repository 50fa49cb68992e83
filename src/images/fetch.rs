use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Client error: {0}")]
    ClientError(String),

    #[error("Response body exceeds the size limit")]
    BodyTooLarge,
}

/// Request headers passed through to the origin (auth, cookies).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardedHeaders(Vec<(String, String)>);

impl ForwardedHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Head of an origin response. The body is only read on demand.
#[async_trait]
pub trait SourceResponse: Send {
    fn status(&self) -> u16;

    fn content_type(&self) -> Option<&str>;

    /// Length declared by the origin, if any.
    fn content_length(&self) -> Option<u64>;

    /// Reads the whole body, failing with `BodyTooLarge` past `limit` bytes.
    async fn read_body(self: Box<Self>, limit: u64) -> Result<Bytes, FetchError>;
}

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &Url,
        headers: &ForwardedHeaders,
    ) -> Result<Box<dyn SourceResponse>, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: u64, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::ClientError(format!("Failed to build client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &Url,
        headers: &ForwardedHeaders,
    ) -> Result<Box<dyn SourceResponse>, FetchError> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers.iter() {
            // Anything that is not a legal header is silently dropped
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                header_map.append(name, value);
            }
        }

        let request = self
            .client
            .get(url.as_str())
            .header("Accept", "image/avif,image/webp,image/*,*/*;q=0.8")
            .headers(header_map);

        let response = request.send().await?;
        log::debug!("Origin answered {} for {}", response.status(), url);

        Ok(Box::new(HttpResponse { response }))
    }
}

struct HttpResponse {
    response: reqwest::Response,
}

#[async_trait]
impl SourceResponse for HttpResponse {
    fn status(&self) -> u16 {
        self.response.status().as_u16()
    }

    fn content_type(&self) -> Option<&str> {
        self.response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
    }

    fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    async fn read_body(self: Box<Self>, limit: u64) -> Result<Bytes, FetchError> {
        let mut response = self.response;
        let mut body = BytesMut::new();

        while let Some(chunk) = response.chunk().await? {
            if (body.len() + chunk.len()) as u64 > limit {
                return Err(FetchError::BodyTooLarge);
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body.freeze())
    }
}
