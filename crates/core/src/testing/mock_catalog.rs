//! Mock product catalog for testing.

use std::sync::Mutex;

use crate::catalog::{CatalogError, CatalogRow, ProductCatalog, ProductId};

/// A recorded photo path update for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpdate {
    pub product_id: ProductId,
    pub photo_path: String,
}

/// In-memory implementation of the ProductCatalog trait.
///
/// Rows are served as given. Photo path updates apply to every row of the
/// product and are recorded, or fail when an error has been injected.
#[derive(Debug, Default)]
pub struct MockCatalog {
    rows: Mutex<Vec<CatalogRow>>,
    updates: Mutex<Vec<RecordedUpdate>>,
    update_error: Mutex<Option<String>>,
    read_error: Mutex<Option<String>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<CatalogRow>) -> Self {
        let catalog = Self::new();
        if let Ok(mut guard) = catalog.rows.lock() {
            *guard = rows;
        }
        catalog
    }

    /// Make every subsequent `update_photo_path` fail with a database error.
    pub fn fail_updates(&self, message: &str) {
        if let Ok(mut guard) = self.update_error.lock() {
            *guard = Some(message.to_string());
        }
    }

    /// Make every subsequent read fail with a database error.
    pub fn fail_reads(&self, message: &str) {
        if let Ok(mut guard) = self.read_error.lock() {
            *guard = Some(message.to_string());
        }
    }

    /// Get recorded photo path updates.
    pub fn recorded_updates(&self) -> Vec<RecordedUpdate> {
        self.updates.lock().map(|u| u.clone()).unwrap_or_default()
    }

    fn check_read(&self) -> Result<(), CatalogError> {
        match self.read_error.lock() {
            Ok(guard) => match guard.as_ref() {
                Some(message) => Err(CatalogError::Database(message.clone())),
                None => Ok(()),
            },
            Err(_) => Err(CatalogError::Internal("mock lock poisoned".to_string())),
        }
    }

    fn rows_guard(&self) -> Result<std::sync::MutexGuard<'_, Vec<CatalogRow>>, CatalogError> {
        self.rows
            .lock()
            .map_err(|_| CatalogError::Internal("mock lock poisoned".to_string()))
    }
}

impl ProductCatalog for MockCatalog {
    fn rows(&self) -> Result<Vec<CatalogRow>, CatalogError> {
        self.check_read()?;
        Ok(self.rows_guard()?.clone())
    }

    fn product_rows(&self, product_id: ProductId) -> Result<Vec<CatalogRow>, CatalogError> {
        self.check_read()?;
        let rows: Vec<CatalogRow> = self
            .rows_guard()?
            .iter()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();
        if rows.is_empty() {
            return Err(CatalogError::NotFound(product_id.to_string()));
        }
        Ok(rows)
    }

    fn update_photo_path(
        &self,
        product_id: ProductId,
        photo_path: &str,
    ) -> Result<u64, CatalogError> {
        if let Ok(guard) = self.update_error.lock() {
            if let Some(message) = guard.as_ref() {
                return Err(CatalogError::Database(message.clone()));
            }
        }

        let mut rows = self.rows_guard()?;
        let mut touched = false;
        for row in rows.iter_mut().filter(|r| r.product_id == product_id) {
            row.photo_path = Some(photo_path.to_string());
            touched = true;
        }

        if let Ok(mut updates) = self.updates.lock() {
            updates.push(RecordedUpdate {
                product_id,
                photo_path: photo_path.to_string(),
            });
        }

        // One product row, however many branch rows it spans
        Ok(u64::from(touched))
    }
}
