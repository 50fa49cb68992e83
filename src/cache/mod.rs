mod image;
mod key;
pub mod lru;

pub use self::image::{ImageCache, Thumbnail, ThumbnailCache};
pub use self::key::{CacheKey, Operation};
