//! Catalog row filtering and summaries.

use serde::{Deserialize, Serialize};

use super::{CatalogRow, ProductStatus};
use crate::barcode::has_barcode;

/// Photo registration filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PhotoFilter {
    #[default]
    All,
    WithPhoto,
    WithoutPhoto,
}

/// Exclusion date filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionFilter {
    #[default]
    All,
    ActiveOnly,
    ExcludedOnly,
}

/// Criteria for narrowing a catalog snapshot. Empty criteria match all rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFilter {
    /// Exact product code.
    #[serde(default)]
    pub code: Option<String>,
    /// Partial barcode.
    #[serde(default)]
    pub barcode: Option<String>,
    /// Case-insensitive description fragment.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub branches: Vec<i64>,
    #[serde(default)]
    pub statuses: Vec<ProductStatus>,
    #[serde(default)]
    pub departments: Vec<String>,
    #[serde(default)]
    pub min_days_without_sale: Option<i64>,
    #[serde(default)]
    pub photo: PhotoFilter,
    #[serde(default)]
    pub exclusion: ExclusionFilter,
}

impl CatalogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_photo(mut self, photo: PhotoFilter) -> Self {
        self.photo = photo;
        self
    }

    pub fn with_exclusion(mut self, exclusion: ExclusionFilter) -> Self {
        self.exclusion = exclusion;
        self
    }

    /// Return the rows matching every criterion, in input order.
    pub fn apply(&self, rows: &[CatalogRow]) -> Vec<CatalogRow> {
        rows.iter().filter(|r| self.matches(r)).cloned().collect()
    }

    pub fn matches(&self, row: &CatalogRow) -> bool {
        if let Some(code) = non_blank(&self.code) {
            if row.product_id.to_string() != code {
                return false;
            }
        }

        if let Some(query) = non_blank(&self.barcode) {
            let in_primary = row
                .barcode
                .as_deref()
                .map(|b| b.contains(query))
                .unwrap_or(false);
            if !in_primary && !has_barcode(row.barcodes.as_deref(), query) {
                return false;
            }
        }

        if let Some(fragment) = non_blank(&self.description) {
            if !row
                .description
                .to_lowercase()
                .contains(&fragment.to_lowercase())
            {
                return false;
            }
        }

        if !self.branches.is_empty() && !self.branches.contains(&row.branch_id) {
            return false;
        }

        if !self.statuses.is_empty() && !self.statuses.contains(&row.status) {
            return false;
        }

        if !self.departments.is_empty() {
            match &row.department {
                Some(dept) if self.departments.contains(dept) => {}
                _ => return false,
            }
        }

        if let Some(min_days) = self.min_days_without_sale {
            // Rows without a sale date only pass a zero threshold
            if row.days_without_sale.unwrap_or(0) < min_days {
                return false;
            }
        }

        let photo_ok = match self.photo {
            PhotoFilter::All => true,
            PhotoFilter::WithPhoto => row.has_photo(),
            PhotoFilter::WithoutPhoto => !row.has_photo(),
        };
        if !photo_ok {
            return false;
        }

        match self.exclusion {
            ExclusionFilter::All => true,
            ExclusionFilter::ActiveOnly => !row.is_excluded(),
            ExclusionFilter::ExcludedOnly => row.is_excluded(),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Headline numbers for a set of rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSummary {
    /// Number of rows (product and branch pairs).
    pub products: usize,
    pub total_stock: f64,
}

impl CatalogSummary {
    pub fn from_rows(rows: &[CatalogRow]) -> Self {
        Self {
            products: rows.len(),
            total_stock: rows.iter().map(|r| r.stock_qty).sum(),
        }
    }
}
