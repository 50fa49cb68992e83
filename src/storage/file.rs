use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use image::ImageFormat;
use log::{debug, warn};
use tokio::fs;

use super::{StoreError, ThumbnailStore};
use crate::cache::{CacheKey, Thumbnail};

const EXTENSION: &str = "jpg";

/// Stores each thumbnail as `<key>.jpg` inside one directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens the store, creating the directory when it does not exist yet.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        debug!("Thumbnail storage opened at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{}.{}", key, EXTENSION))
    }

    fn key_from_path(path: &Path) -> Option<CacheKey> {
        if path.extension()? != EXTENSION {
            return None;
        }
        CacheKey::parse(path.file_stem()?.to_str()?)
    }
}

#[async_trait]
impl ThumbnailStore for FileStore {
    async fn list_keys(&self) -> Result<Vec<CacheKey>, StoreError> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut found: Vec<(SystemTime, CacheKey)> = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(key) = Self::key_from_path(&path) else {
                continue;
            };

            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }

            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            found.push((modified, key));
        }

        // Directory order is arbitrary, modification time is not
        found.sort();

        Ok(found.into_iter().map(|(_, key)| key).collect())
    }

    async fn get(&self, key: &CacheKey) -> Result<Thumbnail, StoreError> {
        let data = match fs::read(self.path_for(key)).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(key.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        if !matches!(image::guess_format(&data), Ok(ImageFormat::Jpeg)) {
            warn!("Stored thumbnail {} is not a JPEG", key);
            return Err(StoreError::Corrupt(key.clone()));
        }

        Ok(Thumbnail::new(data))
    }

    async fn set(&self, thumbnail: &Thumbnail, key: &CacheKey) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).await?;

        // Write next to the target and rename so readers never see a partial file
        let target = self.path_for(key);
        let partial = self.root.join(format!("{}.partial", key));

        fs::write(&partial, thumbnail.data()).await?;
        if let Err(e) = fs::rename(&partial, &target).await {
            let _ = fs::remove_file(&partial).await;
            return Err(e.into());
        }

        debug!("Stored thumbnail {} ({} bytes)", key, thumbnail.len());
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(key.clone())),
            Err(e) => Err(e.into()),
        }
    }
}
