//! File-backed local progress cache.
//!
//! One JSON document per key, `{cache_dir}/{key}.json`, holding
//! `{ "data": ... }`. Bytes outside `[A-Za-z0-9._-]` in the key are
//! percent-encoded so every entry stays a single file inside the cache
//! directory. Writes go to a temporary sibling first and are renamed
//! into place so a crash never leaves a truncated file behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use levelup_core::model::{ProgressKey, ProgressSnapshot, TimerResumeToken};

use crate::backend::ProgressCache;
use crate::error::StoreResult;

#[derive(Serialize, Deserialize)]
struct CacheEntry<T> {
    data: T,
}

/// Local cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    dir: PathBuf,
}

impl LocalFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `name`.
    pub fn entry_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(name)))
    }

    async fn read_entry<T: DeserializeOwned>(&self, name: &str) -> StoreResult<Option<T>> {
        let path = self.entry_path(name);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entry: CacheEntry<T> = serde_json::from_str(&content)?;
        Ok(Some(entry.data))
    }

    async fn write_entry<T: Serialize + Sync>(&self, name: &str, data: &T) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(&CacheEntry { data })?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.entry_path(name);
        let tmp = self.dir.join(format!("{}.json.tmp", file_stem(name)));
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::trace!(path = %path.display(), "cache entry written");
        Ok(())
    }

    async fn remove_entry(&self, name: &str) -> StoreResult<bool> {
        match tokio::fs::remove_file(self.entry_path(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn file_stem(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'-' => {
                stem.push(byte as char)
            }
            other => stem.push_str(&format!("%{other:02X}")),
        }
    }
    stem
}

#[async_trait]
impl ProgressCache for LocalFileStore {
    async fn read_progress(&self, key: &ProgressKey) -> StoreResult<Option<ProgressSnapshot>> {
        self.read_entry(&key.storage_key()).await
    }

    async fn write_progress(
        &self,
        key: &ProgressKey,
        snapshot: &ProgressSnapshot,
    ) -> StoreResult<()> {
        self.write_entry(&key.storage_key(), snapshot).await
    }

    async fn remove_progress(&self, key: &ProgressKey) -> StoreResult<bool> {
        self.remove_entry(&key.storage_key()).await
    }

    async fn read_timer(&self, key: &ProgressKey) -> StoreResult<Option<TimerResumeToken>> {
        self.read_entry(&key.timer_key()).await
    }

    async fn write_timer(&self, key: &ProgressKey, token: &TimerResumeToken) -> StoreResult<()> {
        self.write_entry(&key.timer_key(), token).await
    }

    async fn remove_timer(&self, key: &ProgressKey) -> StoreResult<bool> {
        self.remove_entry(&key.timer_key()).await
    }
}
