//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Newswire database.
//! Timestamps are stored as RFC3339 text.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Websites being crawled
CREATE TABLE IF NOT EXISTS websites (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    base_url TEXT NOT NULL
);

-- Every article URL seen in a sitemap
CREATE TABLE IF NOT EXISTS sitemaps (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    website_id INTEGER NOT NULL REFERENCES websites(id),
    article_url TEXT NOT NULL,
    last_mod TEXT,
    created_at TEXT NOT NULL,
    is_valid INTEGER NOT NULL DEFAULT 1,
    status_code INTEGER,
    last_checked TEXT NOT NULL,
    UNIQUE(website_id, article_url)
);

CREATE INDEX IF NOT EXISTS idx_sitemaps_website ON sitemaps(website_id);

-- Category tree, parents referenced by id
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    website_id INTEGER NOT NULL REFERENCES websites(id),
    name TEXT NOT NULL,
    slug TEXT NOT NULL,
    url TEXT NOT NULL,
    parent_id INTEGER REFERENCES categories(id),
    created_at TEXT NOT NULL,
    UNIQUE(website_id, slug)
);

CREATE INDEX IF NOT EXISTS idx_categories_parent ON categories(parent_id);

-- Extracted articles
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    website_id INTEGER NOT NULL REFERENCES websites(id),
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    author TEXT NOT NULL,
    publish_date TEXT,
    last_updated TEXT,
    url TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_articles_website ON articles(website_id);

-- Article/category membership, replaced wholesale on every article write
CREATE TABLE IF NOT EXISTS article_categories (
    article_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
    category_id INTEGER NOT NULL REFERENCES categories(id),
    PRIMARY KEY(article_id, category_id)
);

CREATE INDEX IF NOT EXISTS idx_article_categories_category ON article_categories(category_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
