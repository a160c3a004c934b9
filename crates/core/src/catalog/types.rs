//! Types for the product catalog.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::barcode::{self, BarcodeSet};

/// Catalog product identifier.
///
/// Identifiers reach the core as text (URL paths, spreadsheet exports,
/// analytics frames) where integers are often rendered as floats. Parsing
/// coerces those to the store's native integer before any persistence call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(i64);

impl ProductId {
    pub fn new(id: i64) -> Result<Self, ProductIdError> {
        if id <= 0 {
            return Err(ProductIdError::NotPositive(id.to_string()));
        }
        Ok(Self(id))
    }

    pub fn get(self) -> i64 {
        self.0
    }

    /// Coerce an external representation into a product id.
    ///
    /// Accepts `"42"`, `" 42 "` and integral float renderings such as
    /// `"42.0"`. Rejects fractions, non-numeric text and non-positive values.
    pub fn parse(value: &str) -> Result<Self, ProductIdError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ProductIdError::Empty);
        }

        if let Ok(id) = trimmed.parse::<i64>() {
            return Self::new(id);
        }

        let float: f64 = trimmed
            .parse()
            .map_err(|_| ProductIdError::NotNumeric(trimmed.to_string()))?;
        if !float.is_finite() || float.fract() != 0.0 {
            return Err(ProductIdError::NotIntegral(trimmed.to_string()));
        }
        if float > i64::MAX as f64 || float < i64::MIN as f64 {
            return Err(ProductIdError::NotIntegral(trimmed.to_string()));
        }

        Self::new(float as i64)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProductId {
    type Err = ProductIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Errors from product id coercion.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProductIdError {
    #[error("Product id is empty")]
    Empty,

    #[error("Product id is not numeric: {0}")]
    NotNumeric(String),

    #[error("Product id is not an integer: {0}")]
    NotIntegral(String),

    #[error("Product id must be positive: {0}")]
    NotPositive(String),
}

/// Commercial status of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Active,
    OutOfLine,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::OutOfLine => "out_of_line",
        }
    }
}

impl FromStr for ProductStatus {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "out_of_line" => Ok(Self::OutOfLine),
            other => Err(CatalogError::Internal(format!(
                "Unknown product status: {}",
                other
            ))),
        }
    }
}

/// One product in one branch, as read from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRow {
    pub product_id: ProductId,
    pub description: String,
    /// Barcode of the smallest packaging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    /// Every registered barcode, `|`-delimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcodes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packaging: Option<String>,
    pub branch_id: i64,
    pub stock_qty: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sale_date: Option<NaiveDate>,
    /// Whole days since the last sale, relative to the snapshot date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_without_sale: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_at: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default)]
    pub status: ProductStatus,
}

impl CatalogRow {
    /// Barcode preferred for searching this product.
    pub fn primary_barcode(&self) -> Option<String> {
        barcode::primary_barcode(self.barcode.as_deref(), self.barcodes.as_deref())
    }

    pub fn barcode_set(&self) -> BarcodeSet {
        BarcodeSet::new(self.barcode.as_deref(), self.barcodes.as_deref())
    }

    /// Whether a non-blank photo path is registered.
    pub fn has_photo(&self) -> bool {
        self.photo_path
            .as_deref()
            .map(|p| !p.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn is_excluded(&self) -> bool {
        self.excluded_at.is_some()
    }
}

/// Errors for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
