mod error;
pub mod fetch;
mod service;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use error::PreviewError;
pub use fetch::{FetchError, ForwardedHeaders, HttpFetcher, SourceFetcher, SourceResponse};
pub use service::{PreviewService, ServiceOptions};
