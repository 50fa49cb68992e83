use std::sync::Arc;

use thiserror::Error;

use super::fetch::FetchError;
use crate::storage::StoreError;

#[derive(Error, Debug, Clone)]
pub enum PreviewError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to fetch source image: {0}")]
    RemoteFetchFailed(String),

    #[error("Image not found on remote server (status {0})")]
    ImageNotFound(u16),

    #[error("Requested URL does not point to an image (content type '{0}')")]
    NotAnImage(String),

    #[error("Image size exceeds the limit of {limit_kb} KB")]
    ImageTooLarge { limit_kb: u64 },

    #[error("Failed to decode source image: {0}")]
    DecodeFailed(String),

    #[error("Requested size {width}x{height} exceeds source size {source_width}x{source_height}")]
    OutOfBounds {
        width: u32,
        height: u32,
        source_width: u32,
        source_height: u32,
    },

    #[error("Failed to resize image: {0}")]
    ResizeFailed(String),

    #[error("Failed to persist thumbnail: {0}")]
    PersistFailed(#[source] Arc<StoreError>),
}

impl PreviewError {
    /// Converts a transport-level failure, given the configured size cap.
    pub fn from_fetch(error: FetchError, limit_kb: u64) -> Self {
        match error {
            FetchError::BodyTooLarge => PreviewError::ImageTooLarge { limit_kb },
            other => PreviewError::RemoteFetchFailed(other.to_string()),
        }
    }
}
