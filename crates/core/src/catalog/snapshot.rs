//! Read-through cache of the catalog projection.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;

use super::{CatalogError, CatalogRow, ProductCatalog, ProductId};

struct Cached {
    loaded_at: Instant,
    rows: Arc<Vec<CatalogRow>>,
}

/// Serves catalog rows from memory for up to `ttl`, re-reading afterwards.
///
/// Writers that change catalog data must call [`CatalogSnapshot::invalidate`]
/// so the next read observes the change.
pub struct CatalogSnapshot {
    catalog: Arc<dyn ProductCatalog>,
    ttl: Duration,
    cached: Mutex<Option<Cached>>,
}

impl CatalogSnapshot {
    pub fn new(catalog: Arc<dyn ProductCatalog>, ttl: Duration) -> Self {
        Self {
            catalog,
            ttl,
            cached: Mutex::new(None),
        }
    }

    /// Current rows, loading them if the cached copy is missing or stale.
    pub fn rows(&self) -> Result<Arc<Vec<CatalogRow>>, CatalogError> {
        let mut cached = self
            .cached
            .lock()
            .map_err(|_| CatalogError::Internal("snapshot lock poisoned".to_string()))?;

        if let Some(entry) = cached.as_ref() {
            if entry.loaded_at.elapsed() < self.ttl {
                return Ok(Arc::clone(&entry.rows));
            }
        }

        let rows = Arc::new(self.catalog.rows()?);
        debug!(rows = rows.len(), "Loaded catalog snapshot");
        *cached = Some(Cached {
            loaded_at: Instant::now(),
            rows: Arc::clone(&rows),
        });
        Ok(rows)
    }

    /// Drop the cached rows so the next read goes to the catalog.
    pub fn invalidate(&self) {
        if let Ok(mut cached) = self.cached.lock() {
            if cached.take().is_some() {
                debug!("Catalog snapshot invalidated");
            }
        }
    }

    /// [`rows`](Self::rows) on the blocking pool, for async callers.
    pub async fn load(self: &Arc<Self>) -> Result<Arc<Vec<CatalogRow>>, CatalogError> {
        let snapshot = Arc::clone(self);
        run_blocking(move || snapshot.rows()).await
    }

    /// Rows of one product read straight from the catalog on the blocking pool.
    pub async fn product_rows(
        self: &Arc<Self>,
        product_id: ProductId,
    ) -> Result<Vec<CatalogRow>, CatalogError> {
        let catalog = Arc::clone(&self.catalog);
        run_blocking(move || catalog.product_rows(product_id)).await
    }

    /// Point the product's photo path at `photo_path` on the blocking pool.
    ///
    /// The cached rows are left alone; callers invalidate once the whole
    /// change is complete.
    pub async fn update_photo_path(
        self: &Arc<Self>,
        product_id: ProductId,
        photo_path: String,
    ) -> Result<u64, CatalogError> {
        let catalog = Arc::clone(&self.catalog);
        run_blocking(move || catalog.update_photo_path(product_id, &photo_path)).await
    }

    /// Whether a fresh copy is held.
    pub fn is_warm(&self) -> bool {
        self.cached
            .lock()
            .map(|c| c.as_ref().is_some_and(|e| e.loaded_at.elapsed() < self.ttl))
            .unwrap_or(false)
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, CatalogError>
where
    F: FnOnce() -> Result<T, CatalogError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CatalogError::Internal(format!("catalog task failed: {}", e)))?
}
