// src/storage/mod.rs

//! Dedup store persistence.
//!
//! The store maps an article's content hash to the first time it was seen.
//! It is read whole at the start of a run and written whole at the end.
//!
//! ```text
//! processed_articles.json
//! {
//!   "<md5 of title+link>": {
//!     "title": "...",
//!     "processed_at": "2026-09-01T10:30:00.123456",
//!     "source": "연합뉴스"
//!   }
//! }
//! ```

pub mod local;

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Article;

// Re-export for convenience
pub use local::LocalStorage;

/// First-seen metadata for a processed article.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessedRecord {
    pub title: String,
    pub processed_at: NaiveDateTime,
    pub source: String,
}

/// In-memory hash → record mapping. Records are never removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct DedupStore {
    records: BTreeMap<String, ProcessedRecord>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the hash has been seen before.
    pub fn contains(&self, hash: &str) -> bool {
        self.records.contains_key(hash)
    }

    pub fn get(&self, hash: &str) -> Option<&ProcessedRecord> {
        self.records.get(hash)
    }

    /// Record an article as processed. Returns `false` if it was already known,
    /// in which case the original record is kept.
    pub fn mark(&mut self, article: &Article, at: NaiveDateTime) -> bool {
        let hash = article.content_hash();
        if self.records.contains_key(&hash) {
            return false;
        }
        self.records.insert(
            hash,
            ProcessedRecord {
                title: article.title.clone(),
                processed_at: at,
                source: article.source.clone(),
            },
        );
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Most recent `processed_at` across all records.
    pub fn latest_processed_at(&self) -> Option<NaiveDateTime> {
        self.records.values().map(|r| r.processed_at).max()
    }
}

/// Trait for dedup store backends.
#[async_trait]
pub trait DedupStorage: Send + Sync {
    /// Load the store. A missing backing file is an empty store.
    async fn load(&self) -> Result<DedupStore>;

    /// Replace the persisted store with `store`.
    async fn save(&self, store: &DedupStore) -> Result<()>;

    /// Where the store lives, for log messages.
    fn location(&self) -> &Path;
}
