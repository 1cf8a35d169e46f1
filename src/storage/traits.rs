//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::config::CategoryStructure;
use crate::crawler::{Article, SitemapEntry};
use crate::storage::{
    CategoryBatchReport, CategoryRecord, NewCategory, SaveOutcome, SitemapBatchReport,
    SitemapRecord, StoredArticle,
};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage lock poisoned")]
    Poisoned,

    #[error("Storage task failed: {0}")]
    Task(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The backend exclusively owns every write to sitemap records, categories,
/// articles and article/category links. Each write operation runs inside a
/// single transaction scoped to that call.
pub trait Storage {
    // ===== Websites =====

    /// Inserts or refreshes a website row so foreign keys can reference it
    fn register_website(&mut self, id: i64, name: &str, base_url: &str) -> StorageResult<()>;

    // ===== Sitemap Records =====

    /// Upserts the entries of one sitemap
    ///
    /// All entries share one transaction. Entries are grouped into batches of
    /// `batch_size`, each batch a savepoint processed in encounter order; a
    /// failing batch is rolled back and logged while the other batches commit.
    ///
    /// New URLs are inserted; known URLs get `last_checked`, `status_code` and
    /// `is_valid` refreshed in place.
    fn save_sitemap_entries(
        &mut self,
        entries: &[SitemapEntry],
        website_id: i64,
        status_code: u16,
        batch_size: usize,
    ) -> StorageResult<SitemapBatchReport>;

    /// Gets a sitemap record by its natural key
    fn get_sitemap_record(
        &self,
        website_id: i64,
        article_url: &str,
    ) -> StorageResult<Option<SitemapRecord>>;

    /// Lists article URLs recorded for a website, oldest first
    fn article_urls(&self, website_id: i64) -> StorageResult<Vec<String>>;

    // ===== Categories =====

    /// Upserts categories keyed on (website, slug)
    ///
    /// Categories are processed in the given order within one transaction.
    /// A parent is looked up by slug; a missing parent yields a root category.
    /// A failure on one category is logged and skipped, and the rest commit.
    fn save_categories(
        &mut self,
        categories: &[NewCategory],
        website_id: i64,
        structure: CategoryStructure,
    ) -> StorageResult<CategoryBatchReport>;

    /// Gets a category by its natural key
    fn get_category(&self, website_id: i64, slug: &str) -> StorageResult<Option<CategoryRecord>>;

    // ===== Articles =====

    /// Saves an article if it is new or has changed
    ///
    /// When a change is detected the article row is replaced and its category
    /// links are deleted and re-inserted from the article's category slugs.
    /// Unchanged articles are left untouched, links included.
    fn save_article(&mut self, article: &Article) -> StorageResult<SaveOutcome>;

    /// Gets a stored article, with its linked category slugs, by URL
    fn find_article(&self, url: &str) -> StorageResult<Option<StoredArticle>>;

    // ===== Statistics =====

    /// Counts sitemap records for a website, optionally only valid ones
    fn count_sitemap_records(&self, website_id: i64, valid_only: bool) -> StorageResult<u64>;

    fn count_categories(&self, website_id: i64) -> StorageResult<u64>;

    fn count_articles(&self, website_id: i64) -> StorageResult<u64>;

    /// Counts article/category links for a website's articles
    fn count_links(&self, website_id: i64) -> StorageResult<u64>;
}
