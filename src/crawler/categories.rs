//! Category derivation and resolution
//!
//! Category pages live under a fixed `/category/` marker:
//!
//! ```text
//! https://blueprint.ng/category/news/politics/  ->  slug "news/politics", name "Politics"
//! ```
//!
//! Slugs with path separators are children of the slug with its last segment
//! removed. Parents are resolved by slug at write time.

use crate::config::CategoryStructure;
use crate::crawler::sitemap::parse_sitemap;
use crate::storage::{with_storage, CategoryBatchReport, NewCategory, SharedStorage, Storage};
use crate::Result;

/// Path marker preceding a category slug
pub const CATEGORY_MARKER: &str = "/category/";

/// Fallback used when a category URL carries no marker
pub const UNKNOWN_NAME: &str = "Unknown";
pub const UNKNOWN_SLUG: &str = "unknown";

/// A category reference carried by an article
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CategoryRef {
    /// Display name
    pub name: String,

    /// Slug, unique per website
    pub slug: String,
}

/// Extracts the slug following the category marker
///
/// Returns `None` when the marker is absent or appears more than once, or
/// when nothing follows it.
pub fn slug_from_url(url: &str) -> Option<String> {
    let path = url.split(|c| c == '?' || c == '#').next().unwrap_or(url);

    let mut parts = path.split(CATEGORY_MARKER);
    let _before = parts.next()?;
    let rest = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let slug = rest.trim_matches('/');
    if slug.is_empty() {
        None
    } else {
        Some(slug.to_string())
    }
}

/// Derives a category from its page URL
///
/// The name is built from the last slug segment only, so `news/politics`
/// is named "Politics" rather than "News/Politics".
pub fn category_from_url(url: &str) -> Option<CategoryRef> {
    let slug = slug_from_url(url)?;
    let last = slug.rsplit('/').next().unwrap_or(&slug);
    Some(CategoryRef {
        name: slug_to_name(last),
        slug,
    })
}

/// Like [`category_from_url`], falling back to the "Unknown" category
pub fn category_or_unknown(url: &str) -> CategoryRef {
    category_from_url(url).unwrap_or_else(|| {
        tracing::warn!(url, marker = CATEGORY_MARKER, "Category marker not found, recording as Unknown");
        CategoryRef {
            name: UNKNOWN_NAME.to_string(),
            slug: UNKNOWN_SLUG.to_string(),
        }
    })
}

/// Turns `top-newspaper` into `Top Newspaper`
pub fn slug_to_name(segment: &str) -> String {
    let mut name = String::with_capacity(segment.len());
    let mut boundary = true;
    for c in segment.chars() {
        let c = if c == '-' || c == '_' { ' ' } else { c };
        if boundary {
            name.extend(c.to_uppercase());
        } else {
            name.push(c);
        }
        boundary = !c.is_alphanumeric();
    }
    name
}

/// The parent slug of a nested slug, e.g. `news` for `news/politics`
pub fn parent_slug(slug: &str) -> Option<&str> {
    slug.rsplit_once('/').map(|(parent, _)| parent).filter(|p| !p.is_empty())
}

fn depth(slug: &str) -> usize {
    slug.matches('/').count()
}

/// Turns category sitemap URLs into categories, parents before children
///
/// The sort is stable, so listings already in order keep their order.
pub fn categories_from_urls<'a>(urls: impl IntoIterator<Item = &'a str>) -> Vec<NewCategory> {
    let mut categories: Vec<NewCategory> = urls
        .into_iter()
        .map(|url| {
            let category = category_or_unknown(url);
            NewCategory {
                name: category.name,
                slug: category.slug,
                url: url.to_string(),
            }
        })
        .collect();
    categories.sort_by_key(|c| depth(&c.slug));
    categories
}

/// Persists the categories listed in a category sitemap
pub struct CategoryResolver {
    storage: SharedStorage,
    website_id: i64,
    structure: CategoryStructure,
}

impl CategoryResolver {
    pub fn new(storage: SharedStorage, website_id: i64, structure: CategoryStructure) -> Self {
        Self {
            storage,
            website_id,
            structure,
        }
    }

    /// Parses a category sitemap body and upserts every category in it
    ///
    /// # Returns
    ///
    /// * `Ok(CategoryBatchReport)` - How many categories were saved or skipped
    /// * `Err(NewswireError)` - The sitemap was malformed or the batch could not commit
    pub async fn resolve_categories(&self, body: &str) -> Result<CategoryBatchReport> {
        let entries = parse_sitemap(body)?;
        let categories = categories_from_urls(entries.iter().map(|e| e.location.as_str()));
        tracing::info!(count = categories.len(), "Resolving categories");

        let website_id = self.website_id;
        let structure = self.structure;
        let report = with_storage(&self.storage, move |s| {
            s.save_categories(&categories, website_id, structure)
        })
        .await?;

        tracing::info!(saved = report.saved, skipped = report.skipped, "Categories resolved");
        Ok(report)
    }
}
