//! Storage module for persisting crawl results
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Sitemap record upserts with per-batch savepoints
//! - Hierarchical category upserts
//! - Change-aware article upserts and category link replacement

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// The single storage handle shared by every worker
pub type SharedStorage = Arc<Mutex<SqliteStorage>>;

/// Opens a storage database and wraps it for sharing across workers
pub fn open_shared(path: &Path) -> StorageResult<SharedStorage> {
    Ok(Arc::new(Mutex::new(SqliteStorage::new(path)?)))
}

/// Locks the shared storage, mapping a poisoned lock to an error
pub fn lock(storage: &SharedStorage) -> StorageResult<MutexGuard<'_, SqliteStorage>> {
    storage.lock().map_err(|_| StorageError::Poisoned)
}

/// Runs a storage operation on the blocking thread pool
///
/// The lock is taken on the blocking thread and released when `op` returns,
/// so no lock or transaction is ever held across an await point.
pub async fn with_storage<T, F>(storage: &SharedStorage, op: F) -> StorageResult<T>
where
    T: Send + 'static,
    F: FnOnce(&mut SqliteStorage) -> StorageResult<T> + Send + 'static,
{
    let storage = Arc::clone(storage);
    tokio::task::spawn_blocking(move || {
        let mut guard = lock(&storage)?;
        op(&mut guard)
    })
    .await
    .map_err(|e| StorageError::Task(e.to_string()))?
}

/// A sitemap record as stored
#[derive(Debug, Clone)]
pub struct SitemapRecord {
    pub id: i64,
    pub website_id: i64,
    pub article_url: String,
    pub last_modified: Option<String>,
    pub is_valid: bool,
    pub status_code: Option<u16>,
    pub created_at: String,
    pub last_checked: String,
}

/// A category ready to be upserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    pub url: String,
}

/// A category as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRecord {
    pub id: i64,
    pub website_id: i64,
    pub name: String,
    pub slug: String,
    pub url: String,
    pub parent_id: Option<i64>,
}

/// The stored version of an article, as compared by the change detector
#[derive(Debug, Clone)]
pub struct StoredArticle {
    pub id: i64,
    pub website_id: i64,
    pub url: String,
    pub title: String,
    pub author: String,
    pub content: String,
    pub content_hash: String,
    pub publish_date: Option<String>,
    pub last_updated: Option<String>,
    /// Slugs of the currently linked categories
    pub category_slugs: Vec<String>,
}

/// What an article save did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// First time this URL was saved
    Created(i64),
    /// A change was detected and the article was replaced
    Updated(i64),
    /// Nothing differed; no write happened
    Unchanged(i64),
}

impl SaveOutcome {
    pub fn article_id(&self) -> i64 {
        match self {
            Self::Created(id) | Self::Updated(id) | Self::Unchanged(id) => *id,
        }
    }

    /// Returns true if the article row and its links were written
    pub fn wrote(&self) -> bool {
        !matches!(self, Self::Unchanged(_))
    }
}

/// Result of saving one sitemap's entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SitemapBatchReport {
    /// Rows inserted or refreshed
    pub written: usize,
    /// Batches rolled back after a row failure
    pub failed_batches: usize,
}

/// Result of saving a category batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryBatchReport {
    pub saved: usize,
    pub skipped: usize,
}
