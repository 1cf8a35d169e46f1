//! Crawler coordinator - stage orchestration for one website
//!
//! This module wires the crawl stages together:
//! - Sitemaps: fetch every numbered sitemap behind the admission gate and
//!   upsert its entries
//! - Categories: fetch the category sitemap and resolve the category tree
//! - Articles: feed stored article URLs to the worker pool, extract each page
//!   and save it when it changed
//!
//! Failures are scoped to the sitemap or article that produced them.

use crate::config::{Config, WebsiteConfig};
use crate::crawler::categories::CategoryResolver;
use crate::crawler::extractor::{ArticleExtractor, CompiledRules};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::scheduler::{RunSummary, Scheduler};
use crate::crawler::sitemap::parse_sitemap;
use crate::crawler::Article;
use crate::storage::{with_storage, CategoryBatchReport, SaveOutcome, SharedStorage, Storage};
use crate::{NewswireError, Result};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of running every stage
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub sitemaps: RunSummary,
    /// `None` when the category stage failed
    pub categories: Option<CategoryBatchReport>,
    pub articles: RunSummary,
}

/// Result of extracting the same article twice
#[derive(Debug, Clone)]
pub struct HashCheck {
    pub first: Article,
    pub second: Article,
}

impl HashCheck {
    pub fn matches(&self) -> bool {
        self.first.content_hash == self.second.content_hash
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    website: Arc<WebsiteConfig>,
    storage: SharedStorage,
    fetcher: Fetcher,
    extractor: Arc<ArticleExtractor>,
    scheduler: Scheduler,
}

impl Coordinator {
    /// Creates a coordinator for one website and registers it in storage
    ///
    /// # Arguments
    ///
    /// * `config` - The loaded configuration
    /// * `website` - The website to crawl
    /// * `storage` - The shared storage handle
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run stages
    /// * `Err(NewswireError)` - Selector compilation, client setup or registration failed
    pub async fn new(
        config: &Config,
        website: &WebsiteConfig,
        storage: SharedStorage,
    ) -> Result<Self> {
        let fetcher = Fetcher::new(&config.crawler.user_agent, website.fetch_policy())?;
        let rules = CompiledRules::compile(&website.selectors)?;
        let extractor = ArticleExtractor::new(fetcher.clone(), rules, website.id);

        let (id, name, base_url) = (website.id, website.name.clone(), website.base_url.clone());
        with_storage(&storage, move |s| s.register_website(id, &name, &base_url)).await?;

        tracing::info!(
            website = %website.name,
            id = website.id,
            sitemaps = website.end_index.saturating_sub(website.start_index) + 1,
            workers = website.max_workers,
            "Coordinator ready"
        );

        Ok(Self {
            website: Arc::new(website.clone()),
            storage,
            fetcher,
            extractor: Arc::new(extractor),
            scheduler: Scheduler::new(Duration::from_secs(config.crawler.progress_interval)),
        })
    }

    /// Fetches every configured sitemap and upserts its entries
    pub async fn run_sitemaps(&self) -> RunSummary {
        let urls = self.website.sitemap_urls();
        let fetcher = self.fetcher.clone();
        let storage = Arc::clone(&self.storage);
        let website_id = self.website.id;
        let batch_size = self.website.batch_size;

        self.scheduler
            .run_gated("sitemaps", self.website.max_workers, urls, move |url: String| {
                let fetcher = fetcher.clone();
                let storage = Arc::clone(&storage);
                async move {
                    let result =
                        process_sitemap(&fetcher, &storage, website_id, batch_size, &url).await;
                    if let Err(e) = &result {
                        tracing::error!(url = %url, error = %e, "Error processing sitemap");
                    }
                    result
                }
            })
            .await
    }

    /// Fetches the category sitemap and resolves the category tree
    pub async fn run_categories(&self) -> Result<CategoryBatchReport> {
        let url = &self.website.category_sitemap_url;
        tracing::info!(url = %url, "Fetching category sitemap");

        let page = self.fetcher.fetch(url).await?;
        if !page.is_success() {
            return Err(NewswireError::HttpStatus {
                url: url.clone(),
                status: page.status_code,
            });
        }

        let resolver = CategoryResolver::new(
            Arc::clone(&self.storage),
            self.website.id,
            self.website.category_structure,
        );
        resolver.resolve_categories(&page.body).await
    }

    /// Extracts and saves every article URL recorded from the sitemaps
    pub async fn run_articles(&self) -> Result<RunSummary> {
        let website_id = self.website.id;
        let urls = with_storage(&self.storage, move |s| s.article_urls(website_id)).await?;
        tracing::info!(count = urls.len(), "Found articles to process");

        let extractor = Arc::clone(&self.extractor);
        let storage = Arc::clone(&self.storage);
        let delay = self.website.request_delay();

        let summary = self
            .scheduler
            .run_pool(
                "articles",
                self.website.max_workers,
                self.website.batch_size,
                urls,
                move |url: String| {
                    let extractor = Arc::clone(&extractor);
                    let storage = Arc::clone(&storage);
                    async move {
                        let result = process_article(&extractor, &storage, &url).await;
                        if let Err(e) = &result {
                            tracing::error!(url = %url, error = %e, "Error processing article");
                        }
                        tokio::time::sleep(delay).await;
                        result.map(|_| ())
                    }
                },
            )
            .await;

        Ok(summary)
    }

    /// Runs sitemaps, then categories, then articles
    ///
    /// A failed category stage is logged and the article stage still runs.
    pub async fn run_all(&self) -> Result<CrawlReport> {
        let sitemaps = self.run_sitemaps().await;

        let categories = match self.run_categories().await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::error!(error = %e, "Category stage failed");
                None
            }
        };

        let articles = self.run_articles().await?;

        Ok(CrawlReport {
            sitemaps,
            categories,
            articles,
        })
    }

    /// Extracts `url` twice, without saving, to check the content hash is stable
    pub async fn hash_check(&self, url: &str) -> Result<HashCheck> {
        let first = self.extractor.extract(url).await?;
        let second = self.extractor.extract(url).await?;
        Ok(HashCheck { first, second })
    }
}

/// Fetches one sitemap and saves its entries with the response status
async fn process_sitemap(
    fetcher: &Fetcher,
    storage: &SharedStorage,
    website_id: i64,
    batch_size: usize,
    url: &str,
) -> Result<()> {
    let page = fetcher.fetch(url).await?;

    // Non-2xx bodies are still parsed; their entries are stored as invalid
    let entries = match parse_sitemap(&page.body) {
        Ok(entries) => entries,
        Err(_) if !page.is_success() => {
            return Err(NewswireError::HttpStatus {
                url: url.to_string(),
                status: page.status_code,
            });
        }
        Err(e) => return Err(e),
    };

    let count = entries.len();
    let status_code = page.status_code;
    let report = with_storage(storage, move |s| {
        s.save_sitemap_entries(&entries, website_id, status_code, batch_size)
    })
    .await?;

    tracing::info!(
        url,
        entries = count,
        written = report.written,
        failed_batches = report.failed_batches,
        "Processed sitemap"
    );
    Ok(())
}

/// Extracts one article and saves it when new or changed
async fn process_article(
    extractor: &ArticleExtractor,
    storage: &SharedStorage,
    url: &str,
) -> Result<SaveOutcome> {
    let article = extractor.extract(url).await?;
    let outcome = with_storage(storage, move |s| s.save_article(&article)).await?;

    match outcome {
        SaveOutcome::Created(id) => tracing::info!(url, id, "Saved new article"),
        SaveOutcome::Updated(id) => tracing::info!(url, id, "Updated article"),
        SaveOutcome::Unchanged(id) => tracing::debug!(url, id, "Article unchanged"),
    }
    Ok(outcome)
}
