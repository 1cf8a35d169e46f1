//! Content fingerprinting and change detection
//!
//! An article is rewritten only when its title, content hash, author or
//! category set differs from the stored version.

use crate::crawler::Article;
use crate::storage::StoredArticle;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Hex-encoded SHA-256 of the article body
pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Order- and duplicate-insensitive slug comparison
pub fn same_categories<A, B>(a: &[A], b: &[B]) -> bool
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let a: HashSet<&str> = a.iter().map(AsRef::as_ref).collect();
    let b: HashSet<&str> = b.iter().map(AsRef::as_ref).collect();
    a == b
}

/// Which compared fields differ between the stored and extracted article
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub title: bool,
    pub content: bool,
    pub author: bool,
    pub categories: bool,
}

impl ChangeSet {
    /// Compares a candidate against its stored version
    ///
    /// The candidate's hash is recomputed from its content rather than trusted.
    pub fn between(existing: &StoredArticle, candidate: &Article) -> Self {
        Self {
            title: existing.title != candidate.title,
            content: existing.content_hash != content_hash(&candidate.content),
            author: existing.author != candidate.author,
            categories: !same_categories(
                existing.category_slugs.as_slice(),
                candidate.category_slugs().as_slice(),
            ),
        }
    }

    pub fn any(&self) -> bool {
        self.title || self.content || self.author || self.categories
    }
}

/// Returns true when `candidate` must be written
///
/// A candidate with no stored version is always new.
pub fn has_changed(existing: Option<&StoredArticle>, candidate: &Article) -> bool {
    match existing {
        None => true,
        Some(existing) => ChangeSet::between(existing, candidate).any(),
    }
}
