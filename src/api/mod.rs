mod error;
pub mod params;
pub mod preview;

pub use error::ApiError;
pub use preview::{fill, FillRequest, ImageResponse};
