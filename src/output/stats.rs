//! Statistics generation from the crawl database
//!
//! This module provides functionality for extracting and displaying
//! per-website crawl statistics from the storage layer.

use crate::storage::{Storage, StorageResult};

/// Crawl statistics for one website
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    pub website_id: i64,

    /// Sitemap records seen
    pub sitemap_records: u64,

    /// Sitemap records whose last check returned 2xx
    pub valid_sitemap_records: u64,

    pub categories: u64,
    pub articles: u64,

    /// Article/category links
    pub links: u64,
}

impl CrawlStatistics {
    pub fn invalid_sitemap_records(&self) -> u64 {
        self.sitemap_records.saturating_sub(self.valid_sitemap_records)
    }

    /// Share of sitemap records with an extracted article, as a percentage
    pub fn coverage(&self) -> f64 {
        if self.sitemap_records == 0 {
            0.0
        } else {
            (self.articles as f64 / self.sitemap_records as f64) * 100.0
        }
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `website_id` - The website to report on
pub fn load_statistics(storage: &dyn Storage, website_id: i64) -> StorageResult<CrawlStatistics> {
    Ok(CrawlStatistics {
        website_id,
        sitemap_records: storage.count_sitemap_records(website_id, false)?,
        valid_sitemap_records: storage.count_sitemap_records(website_id, true)?,
        categories: storage.count_categories(website_id)?,
        articles: storage.count_articles(website_id)?,
        links: storage.count_links(website_id)?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(name: &str, stats: &CrawlStatistics) {
    println!("=== Crawl Statistics: {} (id {}) ===\n", name, stats.website_id);

    println!("Sitemaps:");
    println!("  Records: {}", stats.sitemap_records);
    println!("  Valid: {}", stats.valid_sitemap_records);
    println!("  Invalid: {}", stats.invalid_sitemap_records());
    println!();

    println!("Content:");
    println!("  Categories: {}", stats.categories);
    println!("  Articles: {}", stats.articles);
    println!("  Category links: {}", stats.links);
    println!();

    println!(
        "Coverage: {:.1}% ({} / {} sitemap records extracted)",
        stats.coverage(),
        stats.articles,
        stats.sitemap_records
    );
}
