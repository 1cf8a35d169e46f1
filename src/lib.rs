//! Newswire: an incremental news-site crawler
//!
//! This crate crawls a news website's published sitemaps and articles, extracts
//! structured metadata, detects whether previously seen articles have changed,
//! and persists articles, categories and their links into SQLite.

pub mod config;
pub mod crawler;
pub mod output;
pub mod storage;

use thiserror::Error;

/// Main error type for Newswire operations
#[derive(Debug, Error)]
pub enum NewswireError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to fetch {url} after {attempts} attempts: {source}")]
    FetchFailed {
        url: String,
        attempts: u32,
        source: reqwest::Error,
    },

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Unexpected HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Malformed sitemap: {message}")]
    MalformedSitemap { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector for '{field}': {message}")]
    InvalidSelector { field: String, message: String },

    #[error("Unknown website id: {0}")]
    UnknownWebsite(i64),
}

/// Result type alias for Newswire operations
pub type Result<T> = std::result::Result<T, NewswireError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, WebsiteConfig};
pub use crawler::{Article, CategoryRef, Coordinator, SitemapEntry};
pub use storage::{SqliteStorage, Storage};
