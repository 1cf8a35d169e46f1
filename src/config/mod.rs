//! Configuration module for Newswire
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! The loaded values are passed explicitly into every crawler component.
//!
//! # Example
//!
//! ```no_run
//! use newswire::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("newswire.toml")).unwrap();
//! println!("Database: {}", config.database.path);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CategoryStructure, Config, CrawlerConfig, DatabaseConfig, ExtractionRules, WebsiteConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;

/// A Blueprint.ng-shaped website used across unit tests
#[cfg(test)]
pub(crate) fn sample_website() -> WebsiteConfig {
    WebsiteConfig {
        id: 1,
        name: "Blue Print".to_string(),
        base_url: "https://blueprint.ng".to_string(),
        sitemap_format: "https://blueprint.ng/post-sitemap{}.xml".to_string(),
        start_index: 1,
        end_index: 3,
        unnumbered_first: false,
        max_workers: 3,
        batch_size: 100,
        timeout: 90,
        retry_delay: 5,
        max_retries: 3,
        request_delay: None,
        category_sitemap_url: "https://blueprint.ng/category-sitemap.xml".to_string(),
        category_structure: CategoryStructure::Hierarchical,
        selectors: ExtractionRules {
            title: "h1.entry-title".to_string(),
            category: "div.cat-links a".to_string(),
            author: "span.author.vcard a".to_string(),
            published: "time.entry-date.published".to_string(),
            updated: "time.updated".to_string(),
            content: "div.entry-content > p".to_string(),
        },
    }
}
