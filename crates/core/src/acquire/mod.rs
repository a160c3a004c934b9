//! Image acquisition and persistence.
//!
//! Downloads a candidate image, checks that it decodes as a raster image,
//! re-encodes it as PNG into the image directory and points the product's
//! photo path at it.
//!
//! The file write and the catalog update are not atomic together. If the
//! update fails after the file has been written, the file stays on disk
//! without a catalog reference and is not cleaned up.

mod error;

pub use error::AcquireError;

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use image::{DynamicImage, ImageFormat};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use crate::catalog::{CatalogSnapshot, ProductId};
use crate::config::ImageStoreConfig;

/// A stored product image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedImage {
    pub product_id: ProductId,
    /// Path written to the catalog.
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub bytes: u64,
}

/// Downloads, validates and stores product images.
pub struct ImageAcquirer {
    client: Client,
    dir: PathBuf,
    max_bytes: u64,
    snapshot: Arc<CatalogSnapshot>,
}

impl ImageAcquirer {
    /// Create an acquirer writing into `config.dir` and updating the catalog
    /// behind `snapshot`.
    pub fn new(
        config: &ImageStoreConfig,
        snapshot: Arc<CatalogSnapshot>,
    ) -> Result<Self, AcquireError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.download_timeout_secs))
            .build()
            .map_err(|e| AcquireError::Download(e.to_string()))?;

        Ok(Self {
            client,
            dir: config.dir.clone(),
            max_bytes: config.max_download_bytes,
            snapshot,
        })
    }

    /// Directory images are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic file path for a product's image.
    pub fn image_path(&self, product_id: ProductId) -> PathBuf {
        self.dir.join(format!("{}.png", product_id))
    }

    /// Download `url` and register it as the image of `product_id`.
    ///
    /// Nothing is written unless the download succeeds and decodes. On
    /// success the catalog snapshot is invalidated.
    pub async fn save(&self, product_id: ProductId, url: &str) -> Result<SavedImage, AcquireError> {
        let downloaded = self.download(url).await?;
        debug!(
            product_id = %product_id,
            bytes = downloaded.len(),
            "Downloaded candidate image"
        );

        let (png, width, height) = tokio::task::spawn_blocking(move || reencode_png(&downloaded))
            .await
            .map_err(|e| AcquireError::Encode(e.to_string()))??;

        let path = self.image_path(product_id);
        self.write_atomic(&path, &png).await?;

        let photo_path = path.to_string_lossy().into_owned();
        let affected = self
            .snapshot
            .update_photo_path(product_id, photo_path.clone())
            .await?;
        if affected == 0 {
            return Err(AcquireError::ProductNotFound(product_id));
        }

        self.snapshot.invalidate();
        info!(
            product_id = %product_id,
            path = %photo_path,
            width = width,
            height = height,
            "Saved product image"
        );

        Ok(SavedImage {
            product_id,
            path: photo_path,
            width,
            height,
            bytes: png.len() as u64,
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, AcquireError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(classify_download_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquireError::HttpStatus(status.as_u16()));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes {
                return Err(AcquireError::TooLarge {
                    limit: self.max_bytes,
                });
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(classify_download_error)? {
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(AcquireError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }

    /// Write via a temporary sibling file and rename into place.
    async fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), AcquireError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AcquireError::io(&self.dir, e))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let partial = self.dir.join(format!(".{}.part", file_name));

        fs::write(&partial, data)
            .await
            .map_err(|e| AcquireError::io(&partial, e))?;

        if let Err(e) = fs::rename(&partial, path).await {
            let _ = fs::remove_file(&partial).await;
            return Err(AcquireError::io(path, e));
        }

        Ok(())
    }
}

fn classify_download_error(e: reqwest::Error) -> AcquireError {
    if e.is_timeout() {
        AcquireError::Timeout
    } else {
        AcquireError::Download(e.to_string())
    }
}

/// Decode `bytes` and encode the image as PNG.
///
/// Returns the PNG bytes and the image dimensions.
pub fn reencode_png(bytes: &[u8]) -> Result<(Vec<u8>, u32, u32), AcquireError> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| AcquireError::InvalidImage(e.to_string()))?;
    let (width, height) = (decoded.width(), decoded.height());

    // Normalise the pixel layout so every decoded format can be written as PNG
    let normalised = DynamicImage::ImageRgba8(decoded.to_rgba8());

    let mut out = Cursor::new(Vec::new());
    normalised
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| AcquireError::Encode(e.to_string()))?;

    Ok((out.into_inner(), width, height))
}
