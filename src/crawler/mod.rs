//! Crawler module for sitemap, category and article processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with bounded retries
//! - Sitemap parsing
//! - Category derivation and hierarchy resolution
//! - Article extraction and change detection
//! - Bounded-concurrency scheduling and stage coordination

pub mod categories;
pub mod change;
mod coordinator;
pub mod extractor;
mod fetcher;
mod scheduler;
pub mod sitemap;

pub use categories::{CategoryRef, CategoryResolver};
pub use change::{content_hash, has_changed, ChangeSet};
pub use coordinator::{Coordinator, CrawlReport, HashCheck};
pub use extractor::{parse_article, Article, ArticleExtractor, CompiledRules};
pub use fetcher::{build_http_client, FetchPolicy, FetchedPage, Fetcher};
pub use scheduler::{Progress, RunSummary, Scheduler};
pub use sitemap::{parse_sitemap, SitemapEntry};
