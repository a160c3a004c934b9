//! Product catalog access.
//!
//! The catalog is owned by the store system. This module reads point-in-time
//! snapshots of it and writes back exactly one field: a product's photo path.

mod filter;
mod snapshot;
mod sqlite;
mod types;

pub use filter::{CatalogFilter, CatalogSummary, ExclusionFilter, PhotoFilter};
pub use snapshot::CatalogSnapshot;
pub use sqlite::{ProductRecord, SqliteCatalog, StockRecord};
pub use types::*;

/// Trait for catalog storage.
pub trait ProductCatalog: Send + Sync {
    /// Read the current catalog projection.
    ///
    /// Rows are limited to the configured branches and to products sold
    /// within the configured activity window.
    fn rows(&self) -> Result<Vec<CatalogRow>, CatalogError>;

    /// Read every branch row of one product, regardless of activity.
    ///
    /// Returns `CatalogError::NotFound` if the product is unknown.
    fn product_rows(&self, product_id: ProductId) -> Result<Vec<CatalogRow>, CatalogError>;

    /// Point a product's photo path at a new file.
    ///
    /// Runs as a single transaction against one product row and returns the
    /// number of rows affected (0 when the product does not exist).
    fn update_photo_path(&self, product_id: ProductId, photo_path: &str)
        -> Result<u64, CatalogError>;
}
