//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external service traits
//! (image search provider, product catalog), allowing the resolution flow to
//! be tested without real infrastructure.
//!
//! # Example
//!
//! ```rust,ignore
//! use gondola_core::testing::{fixtures, MockCatalog, MockImageSearcher};
//!
//! let searcher = MockImageSearcher::with_candidates(vec![fixtures::image_candidate(1)]);
//! let catalog = MockCatalog::with_rows(vec![fixtures::catalog_row(42, "CAFE PILAO 500G")]);
//!
//! // Use in an ImageResolver...
//! ```

mod mock_catalog;
mod mock_searcher;

pub use mock_catalog::{MockCatalog, RecordedUpdate};
pub use mock_searcher::{MockImageSearcher, RecordedSearch};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::io::Cursor;

    use image::{ImageFormat, Rgb, RgbImage};

    use crate::catalog::{CatalogRow, ProductId, ProductStatus};
    use crate::searcher::ImageCandidate;

    /// Create a catalog row for branch 1 with no barcodes, photo or stock.
    ///
    /// Panics if `product_id` is not positive.
    pub fn catalog_row(product_id: i64, description: &str) -> CatalogRow {
        CatalogRow {
            product_id: ProductId::new(product_id).expect("fixture product id must be positive"),
            description: description.to_string(),
            barcode: None,
            barcodes: None,
            packaging: None,
            branch_id: 1,
            stock_qty: 0.0,
            last_sale_date: None,
            days_without_sale: None,
            photo_path: None,
            excluded_at: None,
            supplier: None,
            department: None,
            section: None,
            status: ProductStatus::Active,
        }
    }

    /// Create a catalog row with a primary barcode and a raw barcode field.
    pub fn catalog_row_with_barcodes(
        product_id: i64,
        description: &str,
        barcode: &str,
        barcodes: &str,
    ) -> CatalogRow {
        let mut row = catalog_row(product_id, description);
        row.barcode = Some(barcode.to_string());
        row.barcodes = Some(barcodes.to_string());
        row
    }

    /// Create an image candidate with a thumbnail.
    pub fn image_candidate(n: u32) -> ImageCandidate {
        ImageCandidate::new(format!("https://images.example.com/{}.jpg", n))
            .with_thumbnail(format!("https://images.example.com/{}-thumb.jpg", n))
    }

    /// Encode a solid-color PNG of the given size.
    pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        encode(width, height, ImageFormat::Png)
    }

    /// Encode a solid-color JPEG of the given size.
    pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        encode(width, height, ImageFormat::Jpeg)
    }

    fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 40]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format)
            .expect("encoding an in-memory fixture image cannot fail");
        buf.into_inner()
    }
}

/// Local HTTP servers for client tests.
#[cfg(test)]
pub mod http {
    use std::net::SocketAddr;

    use axum::Router;
    use tokio::net::TcpListener;

    /// Serve `app` on an ephemeral local port.
    pub async fn serve(app: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    /// An address nothing is listening on.
    pub async fn unused_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr
    }
}
