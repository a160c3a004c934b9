//! Search query construction.

use serde::{Deserialize, Serialize};

use crate::barcode::normalize_barcode;
use crate::normalize::clean_text;

/// How a query was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStrategy {
    /// Exact-match search on a barcode.
    Barcode,
    /// Cleaned description plus a qualifier term.
    Description,
}

/// Text sent to the image search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub strategy: QueryStrategy,
}

impl SearchQuery {
    /// Build the query for a product.
    ///
    /// A valid barcode always wins and is quoted for exact matching; the
    /// description is ignored in that case. Otherwise the cleaned description
    /// is followed by `qualifier`. Returns `None` when neither yields text.
    pub fn build(description: &str, barcode: Option<&str>, qualifier: &str) -> Option<Self> {
        if let Some(barcode) = barcode.and_then(normalize_barcode) {
            return Some(Self {
                text: format!("\"{}\"", barcode),
                strategy: QueryStrategy::Barcode,
            });
        }

        let cleaned = clean_text(description);
        if cleaned.is_empty() {
            return None;
        }

        let qualifier = qualifier.trim();
        let text = if qualifier.is_empty() {
            cleaned
        } else {
            format!("{} {}", cleaned, qualifier)
        };

        Some(Self {
            text,
            strategy: QueryStrategy::Description,
        })
    }
}
