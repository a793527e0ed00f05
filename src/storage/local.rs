// src/storage/local.rs

//! Local filesystem storage for the dedup store.
//!
//! Writes go to a sibling temp file that is then renamed over the target,
//! so an interrupted run never leaves a half-written store behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::{DedupStorage, DedupStore};

/// JSON file backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    /// Create a LocalStorage for the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_dir().await?;

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Size of the store file in bytes, 0 when absent.
    pub async fn file_size(&self) -> u64 {
        tokio::fs::metadata(&self.path)
            .await
            .map(|m| m.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DedupStorage for LocalStorage {
    async fn load(&self) -> Result<DedupStore> {
        match self.read_bytes().await? {
            Some(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(DedupStore::new()),
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => {
                log::info!("No dedup store at {}, starting empty", self.path.display());
                Ok(DedupStore::new())
            }
        }
    }

    async fn save(&self, store: &DedupStore) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(store)?;
        self.write_bytes(&bytes).await?;
        log::info!(
            "Saved {} processed articles to {}",
            store.len(),
            self.path.display()
        );
        Ok(())
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::TempDir;

    use super::*;
    use crate::models::Article;

    fn sample_store() -> DedupStore {
        let at = NaiveDate::from_ymd_opt(2026, 9, 1)
            .unwrap()
            .and_hms_micro_opt(10, 30, 0, 123_456)
            .unwrap();
        let mut store = DedupStore::new();
        store.mark(
            &Article::new("정부, 내년 예산안 국회 제출", "https://www.yna.co.kr/view/1", "연합뉴스"),
            at,
        );
        store.mark(
            &Article::new("Second headline for store", "https://www.yna.co.kr/view/2", "연합뉴스"),
            at,
        );
        store
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("processed_articles.json"));

        let store = sample_store();
        storage.save(&store).await.unwrap();
        let loaded = storage.load().await.unwrap();

        assert_eq!(loaded, store);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("nope.json"));

        let loaded = storage.load().await.unwrap();
        assert!(loaded.is_empty());
        assert_eq!(storage.file_size().await, 0);
    }

    #[tokio::test]
    async fn test_load_corrupt_file_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("processed.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let storage = LocalStorage::new(&path);
        assert!(matches!(storage.load().await, Err(AppError::Json(_))));
    }

    #[tokio::test]
    async fn test_save_creates_parent_and_leaves_no_temp() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state").join("processed.json");
        let storage = LocalStorage::new(&path);

        storage.save(&sample_store()).await.unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
        assert!(storage.file_size().await > 0);

        // Non-ASCII titles are written as-is.
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("예산안"));
    }
}
