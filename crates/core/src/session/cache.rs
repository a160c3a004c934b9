//! Session-scoped memo of search results.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::ProductId;
use crate::searcher::ImageCandidate;

/// Key scoping a cached search to a product and the barcode searched with.
///
/// The same product can yield different results under different barcodes, so
/// the barcode is part of the key whenever one was used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(product_id: ProductId, barcode: Option<&str>) -> Self {
        match barcode.map(str::trim).filter(|b| !b.is_empty()) {
            Some(barcode) => Self(format!("{}_{}", product_id, barcode)),
            None => Self(product_id.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Results of completed searches, by key.
///
/// An empty list means "searched, nothing found", which is distinct from a
/// missing key. There is no eviction and no expiry; entries live until
/// [`SearchCache::clear`] or the end of the session.
#[derive(Debug, Clone, Default)]
pub struct SearchCache {
    entries: HashMap<CacheKey, Vec<ImageCandidate>>,
}

impl SearchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&[ImageCandidate]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn put(&mut self, key: CacheKey, results: Vec<ImageCandidate>) {
        self.entries.insert(key, results);
    }

    pub fn has(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
