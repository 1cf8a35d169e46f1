//! Article extraction
//!
//! Fetches an article page once and pulls its fields out with the website's
//! selector rules:
//! - title and author from the first matching element's text
//! - publish and update dates from an RFC3339 `datetime` attribute
//! - categories from anchors whose href contains the category marker
//! - content from every matching block, trimmed and joined by a blank line
//!
//! Missing optional fields leave the field empty; only fetch failures fail
//! an extraction.

use crate::config::ExtractionRules;
use crate::crawler::categories::{slug_from_url, slug_to_name, CategoryRef};
use crate::crawler::change::content_hash;
use crate::crawler::fetcher::Fetcher;
use crate::{ConfigError, ConfigResult, NewswireError, Result};
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// An extracted article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub website_id: i64,

    /// Natural key of the article
    pub url: String,

    pub title: String,
    pub author: String,

    /// Content blocks joined by a blank line
    pub content: String,

    /// Hex SHA-256 of `content`
    pub content_hash: String,

    pub publish_date: Option<DateTime<Utc>>,
    pub updated_date: Option<DateTime<Utc>>,

    /// Categories in page order
    pub categories: Vec<CategoryRef>,
}

impl Article {
    /// Category slugs in page order
    pub fn category_slugs(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.slug.clone()).collect()
    }
}

/// Extraction rules compiled into selectors
#[derive(Debug, Clone)]
pub struct CompiledRules {
    title: Selector,
    category: Selector,
    author: Selector,
    published: Selector,
    updated: Selector,
    content: Selector,
}

impl CompiledRules {
    pub fn compile(rules: &ExtractionRules) -> ConfigResult<Self> {
        let parse = |field: &str, selector: &str| {
            Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
                field: field.to_string(),
                message: format!("{:?}", e),
            })
        };

        Ok(Self {
            title: parse("title", &rules.title)?,
            category: parse("category", &rules.category)?,
            author: parse("author", &rules.author)?,
            published: parse("published", &rules.published)?,
            updated: parse("updated", &rules.updated)?,
            content: parse("content", &rules.content)?,
        })
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn first_text(document: &Html, selector: &Selector) -> String {
    document
        .select(selector)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

fn datetime_attr(document: &Html, selector: &Selector) -> Option<DateTime<Utc>> {
    let raw = document.select(selector).next()?.value().attr("datetime")?;
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!(value = raw, error = %e, "Ignoring unparsable datetime");
            None
        }
    }
}

fn categories(document: &Html, selector: &Selector, base: Option<&Url>) -> Vec<CategoryRef> {
    let mut found = Vec::new();

    for element in document.select(selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = match base.and_then(|b| b.join(href).ok()) {
            Some(resolved) => resolved.to_string(),
            None => href.to_string(),
        };
        let Some(slug) = slug_from_url(&href) else {
            tracing::debug!(href = %href, "Skipping anchor without category marker");
            continue;
        };

        let mut name = element_text(element);
        if name.is_empty() {
            name = slug_to_name(slug.rsplit('/').next().unwrap_or(&slug));
        }
        tracing::debug!(name = %name, slug = %slug, "Found category");
        found.push(CategoryRef { name, slug });
    }

    found
}

/// Extracts an article from an already fetched page
pub fn parse_article(url: &str, html: &str, website_id: i64, rules: &CompiledRules) -> Article {
    let document = Html::parse_document(html);
    let base = Url::parse(url).ok();

    let content = document
        .select(&rules.content)
        .map(element_text)
        .filter(|block| !block.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    Article {
        website_id,
        url: url.to_string(),
        title: first_text(&document, &rules.title),
        author: first_text(&document, &rules.author),
        content_hash: content_hash(&content),
        content,
        publish_date: datetime_attr(&document, &rules.published),
        updated_date: datetime_attr(&document, &rules.updated),
        categories: categories(&document, &rules.category, base.as_ref()),
    }
}

/// Fetches and extracts articles for one website
#[derive(Debug, Clone)]
pub struct ArticleExtractor {
    fetcher: Fetcher,
    rules: CompiledRules,
    website_id: i64,
}

impl ArticleExtractor {
    pub fn new(fetcher: Fetcher, rules: CompiledRules, website_id: i64) -> Self {
        Self {
            fetcher,
            rules,
            website_id,
        }
    }

    /// Fetches `url` with a single attempt and extracts its article
    ///
    /// # Returns
    ///
    /// * `Ok(Article)` - The page answered 2xx and was parsed
    /// * `Err(NewswireError::Http)` - The request failed
    /// * `Err(NewswireError::HttpStatus)` - The page answered with a non-2xx status
    pub async fn extract(&self, url: &str) -> Result<Article> {
        tracing::debug!(url, "Scraping article");
        let page = self.fetcher.fetch_once(url).await?;
        if !page.is_success() {
            return Err(NewswireError::HttpStatus {
                url: url.to_string(),
                status: page.status_code,
            });
        }

        let article = parse_article(url, &page.body, self.website_id, &self.rules);
        tracing::debug!(
            url,
            title = %article.title,
            categories = article.categories.len(),
            "Extracted article"
        );
        Ok(article)
    }
}
