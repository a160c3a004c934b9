//! Barcode (EAN) parsing and selection.
//!
//! Catalog rows carry a dedicated primary barcode plus a raw `|`-delimited
//! field with every barcode registered for the product's packagings.

use serde::Serialize;

/// Separator used by the raw multi-barcode field.
pub const BARCODE_DELIMITER: char = '|';

/// Shortest string accepted as a barcode.
pub const MIN_BARCODE_LEN: usize = 8;

/// Split a raw barcode field into its valid barcodes.
///
/// Tokens are trimmed and kept only when at least [`MIN_BARCODE_LEN`]
/// characters long. Source order is preserved and duplicates are kept.
pub fn parse_barcodes(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    raw.split(BARCODE_DELIMITER)
        .map(str::trim)
        .filter(|token| is_valid_barcode(token))
        .map(String::from)
        .collect()
}

/// Whether `query` occurs inside any barcode of the raw field.
///
/// Partial matches count. An empty query or a missing field never matches.
pub fn has_barcode(raw: Option<&str>, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return false;
    }

    match raw {
        Some(raw) => parse_barcodes(Some(raw))
            .iter()
            .any(|barcode| barcode.contains(query)),
        None => false,
    }
}

/// Pick the barcode used to search for a product.
///
/// The dedicated field wins when it is valid after cleanup, otherwise the
/// first barcode of the raw field is used.
pub fn primary_barcode(primary: Option<&str>, raw: Option<&str>) -> Option<String> {
    primary
        .and_then(normalize_barcode)
        .or_else(|| parse_barcodes(raw).into_iter().next())
}

/// Trim a barcode and drop a trailing `.0` left by numeric storage.
///
/// Returns `None` if what remains is too short to be a barcode.
pub fn normalize_barcode(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let cleaned = trimmed.strip_suffix(".0").unwrap_or(trimmed).trim();
    is_valid_barcode(cleaned).then(|| cleaned.to_string())
}

fn is_valid_barcode(token: &str) -> bool {
    token.chars().count() >= MIN_BARCODE_LEN
}

/// Every barcode known for a product, primary first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BarcodeSet {
    /// The barcode preferred for searching, if any.
    pub primary: Option<String>,
    /// Parsed barcodes in source order. The primary barcode is prepended when
    /// the raw field does not already list it.
    pub barcodes: Vec<String>,
}

impl BarcodeSet {
    pub fn new(primary_field: Option<&str>, raw: Option<&str>) -> Self {
        let primary = primary_barcode(primary_field, raw);
        let mut barcodes = parse_barcodes(raw);

        if let Some(primary) = &primary {
            if !barcodes.contains(primary) {
                barcodes.insert(0, primary.clone());
            }
        }

        Self { primary, barcodes }
    }

    /// Whether `barcode` is one of this product's barcodes.
    pub fn contains(&self, barcode: &str) -> bool {
        self.barcodes.iter().any(|b| b == barcode)
    }

    pub fn is_empty(&self) -> bool {
        self.barcodes.is_empty()
    }
}
