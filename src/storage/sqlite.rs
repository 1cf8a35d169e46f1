//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::config::CategoryStructure;
use crate::crawler::categories::parent_slug;
use crate::crawler::change::{content_hash, has_changed, ChangeSet};
use crate::crawler::{Article, CategoryRef, SitemapEntry};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageResult};
use crate::storage::{
    CategoryBatchReport, CategoryRecord, NewCategory, SaveOutcome, SitemapBatchReport,
    SitemapRecord, StoredArticle,
};
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const UPSERT_SITEMAP_SQL: &str = "
    INSERT INTO sitemaps (
        website_id, article_url, last_mod, created_at, is_valid, status_code, last_checked
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?4)
    ON CONFLICT(website_id, article_url) DO UPDATE SET
        last_checked = excluded.last_checked,
        status_code = excluded.status_code,
        is_valid = excluded.is_valid";

const UPSERT_CATEGORY_SQL: &str = "
    INSERT INTO categories (website_id, name, slug, url, parent_id, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(website_id, slug) DO UPDATE SET
        name = excluded.name,
        url = excluded.url,
        parent_id = excluded.parent_id
    RETURNING id";

const UPSERT_ARTICLE_SQL: &str = "
    INSERT INTO articles (
        website_id, title, content, content_hash, author, publish_date, last_updated, url, created_at
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
    ON CONFLICT(url) DO UPDATE SET
        title = excluded.title,
        content = excluded.content,
        content_hash = excluded.content_hash,
        author = excluded.author,
        publish_date = excluded.publish_date,
        last_updated = excluded.last_updated
    RETURNING id";

const CATEGORY_ID_SQL: &str = "SELECT id FROM categories WHERE website_id = ?1 AND slug = ?2";

/// Fixed-width UTC timestamp, so stored values sort lexicographically
fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn sitemap_from_row(row: &Row<'_>) -> rusqlite::Result<SitemapRecord> {
    Ok(SitemapRecord {
        id: row.get(0)?,
        website_id: row.get(1)?,
        article_url: row.get(2)?,
        last_modified: row.get(3)?,
        is_valid: row.get(4)?,
        status_code: row.get(5)?,
        created_at: row.get(6)?,
        last_checked: row.get(7)?,
    })
}

/// Reads an article and its linked slugs; works on a connection or a transaction
fn load_article(conn: &Connection, url: &str) -> rusqlite::Result<Option<StoredArticle>> {
    let article = conn
        .query_row(
            "SELECT id, website_id, url, title, author, content, content_hash, publish_date, last_updated
             FROM articles WHERE url = ?1",
            params![url],
            |row| {
                Ok(StoredArticle {
                    id: row.get(0)?,
                    website_id: row.get(1)?,
                    url: row.get(2)?,
                    title: row.get(3)?,
                    author: row.get(4)?,
                    content: row.get(5)?,
                    content_hash: row.get(6)?,
                    publish_date: row.get(7)?,
                    last_updated: row.get(8)?,
                    category_slugs: Vec::new(),
                })
            },
        )
        .optional()?;

    let Some(mut article) = article else {
        return Ok(None);
    };

    let mut stmt = conn.prepare_cached(
        "SELECT c.slug FROM categories c
         JOIN article_categories ac ON c.id = ac.category_id
         WHERE ac.article_id = ?1
         ORDER BY c.slug",
    )?;
    article.category_slugs = stmt
        .query_map(params![article.id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;

    Ok(Some(article))
}

/// Categories of `article` that resolve to a stored row, in page order
///
/// Only these can ever be linked, so only these take part in change detection.
fn linkable_categories(
    conn: &Connection,
    website_id: i64,
    article: &Article,
) -> rusqlite::Result<Vec<CategoryRef>> {
    let mut lookup = conn.prepare_cached(CATEGORY_ID_SQL)?;
    let mut linkable = Vec::with_capacity(article.categories.len());
    for category in &article.categories {
        let found: Option<i64> = lookup
            .query_row(params![website_id, category.slug], |row| row.get(0))
            .optional()?;
        if found.is_some() {
            linkable.push(category.clone());
        }
    }
    Ok(linkable)
}

/// Replaces an article's category links with one link per resolvable slug
///
/// Returns the number of links written. Unresolvable slugs and failed inserts
/// are logged and skipped.
fn replace_links(
    conn: &Connection,
    article_id: i64,
    website_id: i64,
    article: &Article,
) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM article_categories WHERE article_id = ?1",
        params![article_id],
    )?;

    let mut lookup = conn.prepare_cached(CATEGORY_ID_SQL)?;
    let mut insert = conn.prepare_cached(
        "INSERT OR IGNORE INTO article_categories (article_id, category_id) VALUES (?1, ?2)",
    )?;

    let mut linked = 0;
    for category in &article.categories {
        let category_id: Option<i64> = match lookup
            .query_row(params![website_id, category.slug], |row| row.get(0))
            .optional()
        {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(slug = %category.slug, error = %e, "Category lookup failed");
                continue;
            }
        };

        let Some(category_id) = category_id else {
            tracing::warn!(
                slug = %category.slug,
                name = %category.name,
                url = %article.url,
                "Category not found, skipping link"
            );
            continue;
        };

        match insert.execute(params![article_id, category_id]) {
            Ok(_) => linked += 1,
            Err(e) => {
                tracing::warn!(slug = %category.slug, error = %e, "Failed to link category");
            }
        }
    }

    Ok(linked)
}

impl Storage for SqliteStorage {
    // ===== Websites =====

    fn register_website(&mut self, id: i64, name: &str, base_url: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO websites (id, name, base_url) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, base_url = excluded.base_url",
            params![id, name, base_url],
        )?;
        Ok(())
    }

    // ===== Sitemap Records =====

    fn save_sitemap_entries(
        &mut self,
        entries: &[SitemapEntry],
        website_id: i64,
        status_code: u16,
        batch_size: usize,
    ) -> StorageResult<SitemapBatchReport> {
        let is_valid = (200..300).contains(&status_code);
        let mut report = SitemapBatchReport::default();
        let mut tx = self.conn.transaction()?;

        for (index, batch) in entries.chunks(batch_size.max(1)).enumerate() {
            let sp = tx.savepoint()?;
            let result = (|| -> rusqlite::Result<usize> {
                let mut stmt = sp.prepare_cached(UPSERT_SITEMAP_SQL)?;
                for entry in batch {
                    let last_mod = entry
                        .last_modified
                        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true));
                    stmt.execute(params![
                        website_id,
                        entry.location,
                        last_mod,
                        now(),
                        is_valid,
                        status_code,
                    ])?;
                }
                Ok(batch.len())
            })();

            match result {
                Ok(written) => {
                    sp.commit()?;
                    report.written += written;
                }
                Err(e) => {
                    // Dropping the savepoint rolls back this batch only
                    tracing::error!(batch = index, size = batch.len(), error = %e, "Error inserting sitemap batch");
                    report.failed_batches += 1;
                }
            }
        }

        tx.commit()?;
        Ok(report)
    }

    fn get_sitemap_record(
        &self,
        website_id: i64,
        article_url: &str,
    ) -> StorageResult<Option<SitemapRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, website_id, article_url, last_mod, is_valid, status_code, created_at, last_checked
                 FROM sitemaps WHERE website_id = ?1 AND article_url = ?2",
                params![website_id, article_url],
                sitemap_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn article_urls(&self, website_id: i64) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT article_url FROM sitemaps WHERE website_id = ?1 ORDER BY created_at, id",
        )?;
        let urls = stmt
            .query_map(params![website_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(urls)
    }

    // ===== Categories =====

    fn save_categories(
        &mut self,
        categories: &[NewCategory],
        website_id: i64,
        structure: CategoryStructure,
    ) -> StorageResult<CategoryBatchReport> {
        let mut report = CategoryBatchReport::default();
        let tx = self.conn.transaction()?;

        {
            let mut lookup = tx.prepare_cached(CATEGORY_ID_SQL)?;
            let mut upsert = tx.prepare_cached(UPSERT_CATEGORY_SQL)?;

            for category in categories {
                let parent = match structure {
                    CategoryStructure::Flat => None,
                    CategoryStructure::Hierarchical => parent_slug(&category.slug),
                };

                let parent_id: Option<i64> = match parent {
                    None => None,
                    Some(parent) => match lookup
                        .query_row(params![website_id, parent], |row| row.get(0))
                        .optional()
                    {
                        Ok(Some(id)) => Some(id),
                        Ok(None) => {
                            tracing::debug!(slug = %category.slug, parent, "Parent not stored yet, saving as root");
                            None
                        }
                        Err(e) => {
                            tracing::warn!(slug = %category.slug, error = %e, "Error finding parent category");
                            report.skipped += 1;
                            continue;
                        }
                    },
                };

                let saved: rusqlite::Result<i64> = upsert.query_row(
                    params![
                        website_id,
                        category.name,
                        category.slug,
                        category.url,
                        parent_id,
                        now(),
                    ],
                    |row| row.get(0),
                );

                match saved {
                    Ok(id) => {
                        tracing::debug!(id, slug = %category.slug, ?parent_id, "Saved category");
                        report.saved += 1;
                    }
                    Err(e) => {
                        tracing::warn!(url = %category.url, error = %e, "Error inserting category");
                        report.skipped += 1;
                    }
                }
            }
        }

        tx.commit()?;
        Ok(report)
    }

    fn get_category(&self, website_id: i64, slug: &str) -> StorageResult<Option<CategoryRecord>> {
        let category = self
            .conn
            .query_row(
                "SELECT id, website_id, name, slug, url, parent_id
                 FROM categories WHERE website_id = ?1 AND slug = ?2",
                params![website_id, slug],
                |row| {
                    Ok(CategoryRecord {
                        id: row.get(0)?,
                        website_id: row.get(1)?,
                        name: row.get(2)?,
                        slug: row.get(3)?,
                        url: row.get(4)?,
                        parent_id: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(category)
    }

    // ===== Articles =====

    fn save_article(&mut self, article: &Article) -> StorageResult<SaveOutcome> {
        let tx = self.conn.transaction()?;

        let existing = load_article(&tx, &article.url)?;
        let comparable = Article {
            categories: linkable_categories(&tx, article.website_id, article)?,
            ..article.clone()
        };

        match &existing {
            Some(stored) if !has_changed(Some(stored), &comparable) => {
                tracing::debug!(url = %article.url, "No changes detected, skipping write");
                return Ok(SaveOutcome::Unchanged(stored.id));
            }
            Some(stored) => {
                let changes = ChangeSet::between(stored, &comparable);
                tracing::info!(
                    url = %article.url,
                    title = changes.title,
                    content = changes.content,
                    author = changes.author,
                    categories = changes.categories,
                    "Changes detected, updating article"
                );
            }
            None => {}
        }

        let id: i64 = tx.query_row(
            UPSERT_ARTICLE_SQL,
            params![
                article.website_id,
                article.title,
                article.content,
                content_hash(&article.content),
                article.author,
                article.publish_date.map(|d| d.to_rfc3339()),
                article.updated_date.map(|d| d.to_rfc3339()),
                article.url,
                now(),
            ],
            |row| row.get(0),
        )?;

        let linked = replace_links(&tx, id, article.website_id, article)?;
        tx.commit()?;

        tracing::debug!(id, url = %article.url, linked, "Saved article");
        Ok(match existing {
            Some(_) => SaveOutcome::Updated(id),
            None => SaveOutcome::Created(id),
        })
    }

    fn find_article(&self, url: &str) -> StorageResult<Option<StoredArticle>> {
        Ok(load_article(&self.conn, url)?)
    }

    // ===== Statistics =====

    fn count_sitemap_records(&self, website_id: i64, valid_only: bool) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sitemaps WHERE website_id = ?1 AND (?2 = 0 OR is_valid = 1)",
            params![website_id, valid_only],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_categories(&self, website_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM categories WHERE website_id = ?1",
            params![website_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_articles(&self, website_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM articles WHERE website_id = ?1",
            params![website_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_links(&self, website_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM article_categories ac
             JOIN articles a ON a.id = ac.article_id
             WHERE a.website_id = ?1",
            params![website_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::CategoryRef;
    use chrono::{DateTime, TimeZone};
    use std::time::Duration;

    const SITE: i64 = 1;

    fn storage() -> SqliteStorage {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .register_website(SITE, "Blue Print", "https://blueprint.ng")
            .unwrap();
        storage
    }

    fn entry(url: &str) -> SitemapEntry {
        SitemapEntry {
            location: url.to_string(),
            last_modified: None,
        }
    }

    fn category(slug: &str) -> NewCategory {
        NewCategory {
            name: slug.to_string(),
            slug: slug.to_string(),
            url: format!("https://blueprint.ng/category/{}/", slug),
        }
    }

    fn article(url: &str, content: &str, slugs: &[&str]) -> Article {
        Article {
            website_id: SITE,
            url: url.to_string(),
            title: "Police arraign Portable".to_string(),
            author: "Blueprint Reporter".to_string(),
            content: content.to_string(),
            content_hash: content_hash(content),
            publish_date: Some(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()),
            updated_date: None,
            categories: slugs
                .iter()
                .map(|s| CategoryRef {
                    name: s.to_string(),
                    slug: s.to_string(),
                })
                .collect(),
        }
    }

    fn link_rowids(storage: &SqliteStorage, article_id: i64) -> Vec<i64> {
        let mut stmt = storage
            .conn
            .prepare("SELECT rowid FROM article_categories WHERE article_id = ?1 ORDER BY rowid")
            .unwrap();
        stmt.query_map(params![article_id], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    fn parse(ts: &str) -> DateTime<chrono::FixedOffset> {
        DateTime::parse_from_rfc3339(ts).unwrap()
    }

    // ===== Sitemap Records =====

    #[test]
    fn test_save_sitemap_entries_inserts_rows() {
        let mut storage = storage();
        let mut first = entry("https://blueprint.ng/a/");
        first.last_modified = Some(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap());

        let report = storage
            .save_sitemap_entries(&[first, entry("https://blueprint.ng/b/")], SITE, 200, 100)
            .unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(report.failed_batches, 0);

        let record = storage
            .get_sitemap_record(SITE, "https://blueprint.ng/a/")
            .unwrap()
            .unwrap();
        assert_eq!(record.status_code, Some(200));
        assert!(record.is_valid);
        assert_eq!(record.last_modified.as_deref(), Some("2024-05-01T09:00:00Z"));
        assert_eq!(record.created_at, record.last_checked);
    }

    #[test]
    fn test_resighting_refreshes_only_check_columns() {
        let mut storage = storage();
        storage
            .save_sitemap_entries(&[entry("https://blueprint.ng/a/")], SITE, 200, 100)
            .unwrap();
        let before = storage
            .get_sitemap_record(SITE, "https://blueprint.ng/a/")
            .unwrap()
            .unwrap();

        std::thread::sleep(Duration::from_millis(5));
        let entries = vec![
            entry("https://blueprint.ng/a/"),
            entry("https://blueprint.ng/b/"),
            entry("https://blueprint.ng/c/"),
        ];
        storage.save_sitemap_entries(&entries, SITE, 200, 100).unwrap();

        assert_eq!(storage.count_sitemap_records(SITE, false).unwrap(), 3);
        let after = storage
            .get_sitemap_record(SITE, "https://blueprint.ng/a/")
            .unwrap()
            .unwrap();
        assert_eq!(after.id, before.id);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.status_code, before.status_code);
        assert_eq!(after.is_valid, before.is_valid);
        assert!(parse(&after.last_checked) > parse(&before.last_checked));
    }

    #[test]
    fn test_non_success_status_marks_invalid() {
        let mut storage = storage();
        storage
            .save_sitemap_entries(&[entry("https://blueprint.ng/a/")], SITE, 200, 100)
            .unwrap();
        storage
            .save_sitemap_entries(&[entry("https://blueprint.ng/a/")], SITE, 410, 100)
            .unwrap();

        let record = storage
            .get_sitemap_record(SITE, "https://blueprint.ng/a/")
            .unwrap()
            .unwrap();
        assert_eq!(record.status_code, Some(410));
        assert!(!record.is_valid);
        assert_eq!(storage.count_sitemap_records(SITE, true).unwrap(), 0);
    }

    #[test]
    fn test_failed_batch_rolls_back_only_itself() {
        let mut storage = storage();
        // Unknown website ids violate the foreign key, failing that batch
        let entries = vec![
            entry("https://blueprint.ng/a/"),
            entry("https://blueprint.ng/b/"),
            entry("https://blueprint.ng/c/"),
        ];
        storage.save_sitemap_entries(&entries[..2], SITE, 200, 1).unwrap();

        let report = storage.save_sitemap_entries(&entries, 99, 200, 2).unwrap();
        assert_eq!(report.written, 0);
        assert_eq!(report.failed_batches, 2);

        let report = storage.save_sitemap_entries(&entries, SITE, 200, 2).unwrap();
        assert_eq!(report.written, 3);
        assert_eq!(report.failed_batches, 0);
        assert_eq!(storage.count_sitemap_records(SITE, false).unwrap(), 3);
    }

    #[test]
    fn test_article_urls_in_insertion_order() {
        let mut storage = storage();
        let entries = vec![
            entry("https://blueprint.ng/z/"),
            entry("https://blueprint.ng/a/"),
            entry("https://blueprint.ng/m/"),
        ];
        storage.save_sitemap_entries(&entries, SITE, 200, 2).unwrap();

        let urls = storage.article_urls(SITE).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://blueprint.ng/z/",
                "https://blueprint.ng/a/",
                "https://blueprint.ng/m/",
            ]
        );
    }

    // ===== Categories =====

    #[test]
    fn test_parent_before_child_links_hierarchy() {
        let mut storage = storage();
        let report = storage
            .save_categories(
                &[category("news"), category("news/politics")],
                SITE,
                CategoryStructure::Hierarchical,
            )
            .unwrap();
        assert_eq!(report.saved, 2);

        let parent = storage.get_category(SITE, "news").unwrap().unwrap();
        let child = storage.get_category(SITE, "news/politics").unwrap().unwrap();
        assert_eq!(parent.parent_id, None);
        assert_eq!(child.parent_id, Some(parent.id));
    }

    #[test]
    fn test_child_without_parent_is_root_until_resolved_again() {
        let mut storage = storage();
        storage
            .save_categories(&[category("news/politics")], SITE, CategoryStructure::Hierarchical)
            .unwrap();
        let child = storage.get_category(SITE, "news/politics").unwrap().unwrap();
        assert_eq!(child.parent_id, None);

        storage
            .save_categories(&[category("news")], SITE, CategoryStructure::Hierarchical)
            .unwrap();
        storage
            .save_categories(&[category("news/politics")], SITE, CategoryStructure::Hierarchical)
            .unwrap();

        let parent = storage.get_category(SITE, "news").unwrap().unwrap();
        let resolved = storage.get_category(SITE, "news/politics").unwrap().unwrap();
        assert_eq!(resolved.id, child.id);
        assert_eq!(resolved.parent_id, Some(parent.id));
    }

    #[test]
    fn test_category_upsert_overwrites_and_keeps_id() {
        let mut storage = storage();
        storage
            .save_categories(&[category("sports")], SITE, CategoryStructure::Hierarchical)
            .unwrap();
        let first = storage.get_category(SITE, "sports").unwrap().unwrap();

        let renamed = NewCategory {
            name: "Sports Desk".to_string(),
            slug: "sports".to_string(),
            url: "https://blueprint.ng/category/sports-desk/".to_string(),
        };
        storage
            .save_categories(&[renamed], SITE, CategoryStructure::Hierarchical)
            .unwrap();

        let second = storage.get_category(SITE, "sports").unwrap().unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.name, "Sports Desk");
        assert_eq!(second.url, "https://blueprint.ng/category/sports-desk/");
        assert_eq!(storage.count_categories(SITE).unwrap(), 1);
    }

    #[test]
    fn test_flat_structure_ignores_parents() {
        let mut storage = storage();
        storage
            .save_categories(
                &[category("news"), category("news/politics")],
                SITE,
                CategoryStructure::Flat,
            )
            .unwrap();
        let child = storage.get_category(SITE, "news/politics").unwrap().unwrap();
        assert_eq!(child.parent_id, None);
    }

    #[test]
    fn test_failed_category_is_skipped_and_rest_commit() {
        let mut storage = storage();
        // website 99 is unregistered: every insert violates the foreign key
        let report = storage
            .save_categories(&[category("news")], 99, CategoryStructure::Hierarchical)
            .unwrap();
        assert_eq!(report.saved, 0);
        assert_eq!(report.skipped, 1);

        let report = storage
            .save_categories(
                &[category("news"), category("sports")],
                SITE,
                CategoryStructure::Hierarchical,
            )
            .unwrap();
        assert_eq!(report.saved, 2);
        assert_eq!(storage.count_categories(SITE).unwrap(), 2);
    }

    // ===== Articles =====

    #[test]
    fn test_save_new_article_links_categories() {
        let mut storage = storage();
        storage
            .save_categories(
                &[category("news"), category("news/politics")],
                SITE,
                CategoryStructure::Hierarchical,
            )
            .unwrap();

        let outcome = storage
            .save_article(&article(
                "https://blueprint.ng/happening-now-police-arraign-portable/",
                "First paragraph.\n\nSecond paragraph.",
                &["news", "news/politics"],
            ))
            .unwrap();
        assert!(matches!(outcome, SaveOutcome::Created(_)));

        let stored = storage
            .find_article("https://blueprint.ng/happening-now-police-arraign-portable/")
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, outcome.article_id());
        assert_eq!(stored.category_slugs, vec!["news", "news/politics"]);
        assert_eq!(
            stored.content_hash,
            content_hash("First paragraph.\n\nSecond paragraph.")
        );
        assert_eq!(stored.publish_date.as_deref(), Some("2024-05-01T09:00:00+00:00"));
        assert_eq!(stored.last_updated, None);
    }

    #[test]
    fn test_idempotent_save_has_no_link_churn() {
        let mut storage = storage();
        storage
            .save_categories(&[category("news")], SITE, CategoryStructure::Hierarchical)
            .unwrap();
        let a = article("https://blueprint.ng/x/", "Body", &["news"]);

        let first = storage.save_article(&a).unwrap();
        let links_before = link_rowids(&storage, first.article_id());

        let second = storage.save_article(&a).unwrap();
        assert_eq!(second, SaveOutcome::Unchanged(first.article_id()));
        assert_eq!(link_rowids(&storage, first.article_id()), links_before);
        assert_eq!(storage.count_articles(SITE).unwrap(), 1);
    }

    #[test]
    fn test_reordered_categories_are_unchanged() {
        let mut storage = storage();
        storage
            .save_categories(
                &[category("news"), category("sports")],
                SITE,
                CategoryStructure::Hierarchical,
            )
            .unwrap();

        storage
            .save_article(&article("https://blueprint.ng/x/", "Body", &["news", "sports"]))
            .unwrap();
        let outcome = storage
            .save_article(&article("https://blueprint.ng/x/", "Body", &["sports", "news"]))
            .unwrap();
        assert!(!outcome.wrote());
    }

    #[test]
    fn test_content_change_replaces_article_and_links() {
        let mut storage = storage();
        storage
            .save_categories(
                &[category("news"), category("sports")],
                SITE,
                CategoryStructure::Hierarchical,
            )
            .unwrap();

        let first = storage
            .save_article(&article("https://blueprint.ng/x/", "Old body", &["news"]))
            .unwrap();
        let second = storage
            .save_article(&article("https://blueprint.ng/x/", "New body", &["sports"]))
            .unwrap();
        assert_eq!(second, SaveOutcome::Updated(first.article_id()));

        let stored = storage.find_article("https://blueprint.ng/x/").unwrap().unwrap();
        assert_eq!(stored.content, "New body");
        assert_eq!(stored.content_hash, content_hash("New body"));
        assert_eq!(stored.category_slugs, vec!["sports"]);
        assert_eq!(storage.count_links(SITE).unwrap(), 1);
    }

    #[test]
    fn test_unknown_category_slug_is_skipped() {
        let mut storage = storage();
        storage
            .save_categories(&[category("news")], SITE, CategoryStructure::Hierarchical)
            .unwrap();

        let outcome = storage
            .save_article(&article(
                "https://blueprint.ng/x/",
                "Body",
                &["news", "does-not-exist"],
            ))
            .unwrap();
        assert!(outcome.wrote());

        let stored = storage.find_article("https://blueprint.ng/x/").unwrap().unwrap();
        assert_eq!(stored.category_slugs, vec!["news"]);
    }

    #[test]
    fn test_unresolved_slug_does_not_force_rewrite() {
        let mut storage = storage();
        storage
            .save_categories(&[category("news")], SITE, CategoryStructure::Hierarchical)
            .unwrap();
        let a = article("https://blueprint.ng/x/", "Body", &["news", "missing"]);

        let first = storage.save_article(&a).unwrap();
        let id = first.article_id();
        let links = link_rowids(&storage, id);

        assert_eq!(storage.save_article(&a).unwrap(), SaveOutcome::Unchanged(id));
        assert_eq!(storage.save_article(&a).unwrap(), SaveOutcome::Unchanged(id));
        assert_eq!(link_rowids(&storage, id), links);
    }

    #[test]
    fn test_slug_resolved_later_triggers_relink() {
        let mut storage = storage();
        storage
            .save_categories(&[category("news")], SITE, CategoryStructure::Hierarchical)
            .unwrap();
        let a = article("https://blueprint.ng/x/", "Body", &["news", "sports"]);
        let id = storage.save_article(&a).unwrap().article_id();

        storage
            .save_categories(&[category("sports")], SITE, CategoryStructure::Hierarchical)
            .unwrap();
        assert_eq!(storage.save_article(&a).unwrap(), SaveOutcome::Updated(id));

        let stored = storage.find_article("https://blueprint.ng/x/").unwrap().unwrap();
        assert_eq!(stored.category_slugs, vec!["news", "sports"]);
    }

    #[test]
    fn test_failed_article_save_rolls_back() {
        let mut storage = storage();
        let mut a = article("https://blueprint.ng/x/", "Body", &[]);
        a.website_id = 99;

        assert!(storage.save_article(&a).is_err());
        assert!(storage.find_article("https://blueprint.ng/x/").unwrap().is_none());
    }
}
