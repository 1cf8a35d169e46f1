use crate::crawler::FetchPolicy;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Newswire
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "website", default)]
    pub websites: Vec<WebsiteConfig>,
}

impl Config {
    /// Looks up a website by id, or the first configured website when `id` is `None`
    pub fn website(&self, id: Option<i64>) -> Option<&WebsiteConfig> {
        match id {
            Some(id) => self.websites.iter().find(|w| w.id == id),
            None => self.websites.first(),
        }
    }
}

/// Database location
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: String,
}

/// Settings shared by every website crawl
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// User agent sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Seconds between progress reports
    #[serde(rename = "progress-interval", default = "default_progress_interval")]
    pub progress_interval: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            progress_interval: default_progress_interval(),
        }
    }
}

fn default_user_agent() -> String {
    format!("newswire/{}", env!("CARGO_PKG_VERSION"))
}

fn default_progress_interval() -> u64 {
    30
}

/// How category parents are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategoryStructure {
    /// Slugs containing `/` are children of the slug with its last segment removed
    #[default]
    Hierarchical,
    /// Every category is a root
    Flat,
}

/// Per-website crawl settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WebsiteConfig {
    /// Unique identifier, used as `website_id` in every table
    pub id: i64,

    /// Display name of the website
    pub name: String,

    /// Root URL of the website
    pub base_url: String,

    /// Sitemap URL template; `{}` is replaced by the sitemap index
    pub sitemap_format: String,

    pub start_index: u32,
    pub end_index: u32,

    /// When set, the first sitemap carries no index (`post-sitemap.xml`)
    #[serde(default)]
    pub unnumbered_first: bool,

    /// Maximum concurrent sitemap fetches and article workers
    pub max_workers: usize,

    /// Sitemap entries per savepoint, and article queue capacity
    pub batch_size: usize,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Delay between retries in seconds
    pub retry_delay: u64,

    /// Maximum number of fetch attempts
    pub max_retries: u32,

    /// Delay after each article in seconds (defaults to `retry-delay`)
    #[serde(default)]
    pub request_delay: Option<u64>,

    /// URL of the category sitemap
    pub category_sitemap_url: String,

    #[serde(default)]
    pub category_structure: CategoryStructure,

    /// Selector rule set used to extract article fields
    pub selectors: ExtractionRules,
}

impl WebsiteConfig {
    /// Expands the sitemap template over the configured index range
    pub fn sitemap_urls(&self) -> Vec<String> {
        (self.start_index..=self.end_index)
            .map(|index| {
                let rendered = if index == self.start_index && self.unnumbered_first {
                    String::new()
                } else {
                    index.to_string()
                };
                self.sitemap_format.replace("{}", &rendered)
            })
            .collect()
    }

    /// Retry and timeout policy for this website's fetches
    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            timeout: Duration::from_secs(self.timeout),
            max_retries: self.max_retries,
            retry_delay: Duration::from_secs(self.retry_delay),
        }
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_secs(self.request_delay.unwrap_or(self.retry_delay))
    }
}

/// CSS selectors locating each article field
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionRules {
    pub title: String,
    /// Category anchors; each must carry an href containing `category/<slug>/`
    pub category: String,
    pub author: String,
    /// Element carrying the publish `datetime` attribute
    pub published: String,
    /// Element carrying the update `datetime` attribute
    pub updated: String,
    /// Content blocks, concatenated in document order
    pub content: String,
}

impl ExtractionRules {
    /// Field name and selector pairs, in extraction order
    pub fn fields(&self) -> [(&'static str, &str); 6] {
        [
            ("title", self.title.as_str()),
            ("category", self.category.as_str()),
            ("author", self.author.as_str()),
            ("published", self.published.as_str()),
            ("updated", self.updated.as_str()),
            ("content", self.content.as_str()),
        ]
    }
}
