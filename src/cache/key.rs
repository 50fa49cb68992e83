use std::fmt;

use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest.
pub const KEY_LEN: usize = 64;

/// Kind of transformation a cached thumbnail was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Fill,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Fill => "fill",
        }
    }
}

/// Stable identifier of a thumbnail, shared by the in-memory cache and the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn derive(operation: Operation, width: u32, height: u32, normalized_url: &str) -> Self {
        let mut hasher = Sha256::new();

        // Every field is length-prefixed so that no two different tuples
        // feed the same byte stream into the hash.
        let tag = operation.as_str().as_bytes();
        hasher.update((tag.len() as u64).to_be_bytes());
        hasher.update(tag);
        hasher.update(width.to_be_bytes());
        hasher.update(height.to_be_bytes());
        hasher.update((normalized_url.len() as u64).to_be_bytes());
        hasher.update(normalized_url.as_bytes());

        CacheKey(hex::encode(hasher.finalize()))
    }

    /// Accepts a previously derived key, e.g. a file name read back from the store.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() == KEY_LEN && raw.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            Some(CacheKey(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
