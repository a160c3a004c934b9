//! Error types for image acquisition.

use std::path::PathBuf;
use thiserror::Error;

use crate::catalog::{CatalogError, ProductId};

/// Errors that can occur while acquiring and storing a product image.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// The request could not be sent or the body could not be read.
    #[error("Download failed: {0}")]
    Download(String),

    /// The image origin answered with a non-2xx status.
    #[error("Download failed with HTTP {0}")]
    HttpStatus(u16),

    #[error("Download timed out")]
    Timeout,

    #[error("Image exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    /// Downloaded bytes are not a decodable raster image.
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The catalog has no row for the product. The image file stays on disk.
    #[error("Product not found in catalog: {0}")]
    ProductNotFound(ProductId),

    /// The catalog update failed. The image file stays on disk.
    #[error("Catalog update failed: {0}")]
    Catalog(#[from] CatalogError),
}

impl AcquireError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Download(_) => "Could not download the image. Check the link and try again.".to_string(),
            Self::HttpStatus(status) => format!("The image server answered with HTTP {}.", status),
            Self::Timeout => "The image download took too long.".to_string(),
            Self::TooLarge { limit } => format!(
                "The image is too large (limit {} MiB).",
                limit / (1024 * 1024)
            ),
            Self::InvalidImage(_) => "The downloaded file is not a valid image.".to_string(),
            Self::Encode(_) => "The image could not be converted to PNG.".to_string(),
            Self::Io { .. } => "The image could not be written to the image folder.".to_string(),
            Self::ProductNotFound(id) => format!("Product {} was not found in the catalog.", id),
            Self::Catalog(_) => {
                "The image was saved but the product record could not be updated.".to_string()
            }
        }
    }

    /// Label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Download(_) | Self::HttpStatus(_) | Self::Timeout | Self::TooLarge { .. } => {
                "download_failed"
            }
            Self::InvalidImage(_) => "invalid_image",
            Self::Encode(_) | Self::Io { .. } => "store_failed",
            Self::ProductNotFound(_) | Self::Catalog(_) => "catalog_failed",
        }
    }

    /// Whether the image file may have been left on disk without a catalog
    /// reference.
    pub fn leaves_orphan(&self) -> bool {
        matches!(self, Self::ProductNotFound(_) | Self::Catalog(_))
    }
}
