use crate::config::types::{Config, ExtractionRules, WebsiteConfig};
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.database.path.is_empty() {
        return Err(ConfigError::Validation(
            "database path cannot be empty".to_string(),
        ));
    }

    if config.crawler.progress_interval < 1 {
        return Err(ConfigError::Validation(
            "progress_interval must be >= 1 second".to_string(),
        ));
    }

    if config.websites.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[website]] entry is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for website in &config.websites {
        if !seen.insert(website.id) {
            return Err(ConfigError::Validation(format!(
                "duplicate website id {}",
                website.id
            )));
        }
        validate_website(website)?;
    }

    Ok(())
}

/// Validates a single website entry
fn validate_website(site: &WebsiteConfig) -> Result<(), ConfigError> {
    if site.name.is_empty() {
        return Err(ConfigError::Validation(format!(
            "website {} must have a name",
            site.id
        )));
    }

    validate_url("base-url", &site.base_url)?;
    validate_url("category-sitemap-url", &site.category_sitemap_url)?;

    if !site.sitemap_format.contains("{}") {
        return Err(ConfigError::Validation(format!(
            "sitemap-format '{}' must contain a '{{}}' index placeholder",
            site.sitemap_format
        )));
    }
    validate_url("sitemap-format", &site.sitemap_format.replace("{}", "1"))?;

    if site.start_index > site.end_index {
        return Err(ConfigError::Validation(format!(
            "start-index ({}) must not exceed end-index ({})",
            site.start_index, site.end_index
        )));
    }

    if site.max_workers < 1 || site.max_workers > 100 {
        return Err(ConfigError::Validation(format!(
            "max-workers must be between 1 and 100, got {}",
            site.max_workers
        )));
    }

    if site.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch-size must be >= 1, got {}",
            site.batch_size
        )));
    }

    if site.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be >= 1, got {}",
            site.max_retries
        )));
    }

    if site.timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout must be >= 1 second, got {}",
            site.timeout
        )));
    }

    validate_selectors(&site.selectors)
}

fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}

/// Every rule must compile as a CSS selector
fn validate_selectors(rules: &ExtractionRules) -> Result<(), ConfigError> {
    for (field, selector) in rules.fields() {
        if selector.trim().is_empty() {
            return Err(ConfigError::InvalidSelector {
                field: field.to_string(),
                message: "selector cannot be empty".to_string(),
            });
        }
        Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
            field: field.to_string(),
            message: format!("{:?}", e),
        })?;
    }
    Ok(())
}
