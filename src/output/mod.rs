//! Output module for crawl summaries and reports
//!
//! This module handles:
//! - Printing per-website statistics from storage
//! - Printing the outcome of a crawl run

pub mod stats;

pub use stats::{load_statistics, print_statistics, CrawlStatistics};

use crate::crawler::{CrawlReport, HashCheck, RunSummary};

/// Prints the counts of one stage run
pub fn print_run_summary(stage: &str, summary: &RunSummary) {
    println!(
        "{}: {} total, {} succeeded, {} failed",
        stage, summary.total, summary.succeeded, summary.failed
    );
}

/// Prints the outcome of every stage
pub fn print_crawl_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");
    print_run_summary("Sitemaps", &report.sitemaps);
    match &report.categories {
        Some(categories) => println!(
            "Categories: {} saved, {} skipped",
            categories.saved, categories.skipped
        ),
        None => println!("Categories: stage failed"),
    }
    print_run_summary("Articles", &report.articles);
}

/// Prints both hashes of a hash check and whether they match
pub fn print_hash_check(check: &HashCheck) {
    println!("URL: {}", check.first.url);
    println!("Title: {}", check.first.title);
    println!("Hash 1: {}", check.first.content_hash);
    println!("Hash 2: {}", check.second.content_hash);
    if check.matches() {
        println!("Hashes match: content is stable");
    } else {
        println!("Hashes differ: content changed between fetches");
    }
}
