//! SQLite-backed product catalog implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{Duration, Local, NaiveDate, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection};
use serde::{Deserialize, Serialize};

use super::{CatalogError, CatalogRow, ProductCatalog, ProductId, ProductStatus};
use crate::config::CatalogConfig;

const DATE_FORMAT: &str = "%Y-%m-%d";

const ROW_COLUMNS: &str = "p.product_id, p.description, p.barcode, p.barcodes, p.packaging,
     COALESCE(s.branch_id, 0), COALESCE(s.stock_qty, 0.0), s.last_sale_date,
     p.photo_path, p.excluded_at, p.supplier, p.department, p.section, p.status";

/// A product as loaded into the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_id: ProductId,
    pub description: String,
    pub barcode: Option<String>,
    pub barcodes: Option<String>,
    pub packaging: Option<String>,
    pub photo_path: Option<String>,
    pub excluded_at: Option<NaiveDate>,
    pub supplier: Option<String>,
    pub department: Option<String>,
    pub section: Option<String>,
    pub status: ProductStatus,
}

impl ProductRecord {
    pub fn new(product_id: ProductId, description: impl Into<String>) -> Self {
        Self {
            product_id,
            description: description.into(),
            barcode: None,
            barcodes: None,
            packaging: None,
            photo_path: None,
            excluded_at: None,
            supplier: None,
            department: None,
            section: None,
            status: ProductStatus::Active,
        }
    }
}

/// Stock position of one product in one branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    pub product_id: ProductId,
    pub branch_id: i64,
    pub stock_qty: f64,
    pub last_sale_date: Option<NaiveDate>,
}

/// SQLite-backed product catalog.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
    branches: Vec<i64>,
    active_within_days: Option<u32>,
}

impl SqliteCatalog {
    /// Open (or create) the catalog database at `path`.
    pub fn new(path: &Path, settings: &CatalogConfig) -> Result<Self, CatalogError> {
        let conn = Connection::open(path).map_err(|e| CatalogError::Database(e.to_string()))?;
        Self::from_connection(conn, settings)
    }

    /// Create an in-memory catalog (useful for testing).
    pub fn in_memory(settings: &CatalogConfig) -> Result<Self, CatalogError> {
        let conn =
            Connection::open_in_memory().map_err(|e| CatalogError::Database(e.to_string()))?;
        Self::from_connection(conn, settings)
    }

    fn from_connection(conn: Connection, settings: &CatalogConfig) -> Result<Self, CatalogError> {
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            branches: settings.branches.clone(),
            active_within_days: settings.active_within_days,
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CatalogError> {
        conn.execute_batch(
            r#"
            -- One row per product; owns the photo path
            CREATE TABLE IF NOT EXISTS products (
                product_id INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                barcode TEXT,
                barcodes TEXT,
                packaging TEXT,
                photo_path TEXT,
                excluded_at TEXT,
                supplier TEXT,
                department TEXT,
                section TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                updated_at TEXT
            );

            -- One row per product and branch
            CREATE TABLE IF NOT EXISTS stock (
                product_id INTEGER NOT NULL REFERENCES products(product_id) ON DELETE CASCADE,
                branch_id INTEGER NOT NULL,
                stock_qty REAL NOT NULL DEFAULT 0,
                last_sale_date TEXT,
                PRIMARY KEY (product_id, branch_id)
            );

            CREATE INDEX IF NOT EXISTS idx_stock_last_sale ON stock(last_sale_date);
            "#,
        )
        .map_err(|e| CatalogError::Database(e.to_string()))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CatalogError> {
        self.conn
            .lock()
            .map_err(|_| CatalogError::Internal("catalog connection lock poisoned".to_string()))
    }

    /// Insert or replace a product.
    pub fn upsert_product(&self, product: &ProductRecord) -> Result<(), CatalogError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO products (product_id, description, barcode, barcodes, packaging, photo_path,
                                   excluded_at, supplier, department, section, status, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(product_id) DO UPDATE SET
                description = excluded.description,
                barcode = excluded.barcode,
                barcodes = excluded.barcodes,
                packaging = excluded.packaging,
                photo_path = excluded.photo_path,
                excluded_at = excluded.excluded_at,
                supplier = excluded.supplier,
                department = excluded.department,
                section = excluded.section,
                status = excluded.status,
                updated_at = excluded.updated_at",
            params![
                product.product_id.get(),
                &product.description,
                &product.barcode,
                &product.barcodes,
                &product.packaging,
                &product.photo_path,
                product.excluded_at.map(|d| d.format(DATE_FORMAT).to_string()),
                &product.supplier,
                &product.department,
                &product.section,
                product.status.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| CatalogError::Database(e.to_string()))?;

        Ok(())
    }

    /// Insert or replace a stock position. The product must exist.
    pub fn upsert_stock(&self, stock: &StockRecord) -> Result<(), CatalogError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO stock (product_id, branch_id, stock_qty, last_sale_date)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(product_id, branch_id) DO UPDATE SET
                stock_qty = excluded.stock_qty,
                last_sale_date = excluded.last_sale_date",
            params![
                stock.product_id.get(),
                stock.branch_id,
                stock.stock_qty,
                stock.last_sale_date.map(|d| d.format(DATE_FORMAT).to_string()),
            ],
        )
        .map_err(|e| CatalogError::Database(e.to_string()))?;

        Ok(())
    }

    /// Catalog projection as seen on `today`.
    pub fn rows_as_of(&self, today: NaiveDate) -> Result<Vec<CatalogRow>, CatalogError> {
        let mut sql = format!(
            "SELECT {} FROM products p JOIN stock s ON s.product_id = p.product_id WHERE 1 = 1",
            ROW_COLUMNS
        );
        let mut values: Vec<Value> = Vec::new();

        if !self.branches.is_empty() {
            let placeholders = vec!["?"; self.branches.len()].join(", ");
            sql.push_str(&format!(" AND s.branch_id IN ({})", placeholders));
            values.extend(self.branches.iter().map(|b| Value::Integer(*b)));
        }

        if let Some(days) = self.active_within_days {
            let cutoff = today - Duration::days(i64::from(days));
            sql.push_str(" AND s.last_sale_date >= ?");
            values.push(Value::Text(cutoff.format(DATE_FORMAT).to_string()));
        }

        sql.push_str(" ORDER BY p.product_id, s.branch_id");

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Self::row_to_catalog_row(row, today)
            })
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| CatalogError::Database(e.to_string()))?);
        }
        Ok(results)
    }

    fn row_to_catalog_row(row: &rusqlite::Row, today: NaiveDate) -> rusqlite::Result<CatalogRow> {
        let raw_id: i64 = row.get(0)?;
        let product_id = ProductId::new(raw_id)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(e)))?;

        let last_sale_date = parse_date(row, 7)?;
        let status: String = row.get(13)?;
        let status = status
            .parse::<ProductStatus>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(13, Type::Text, Box::new(e)))?;

        Ok(CatalogRow {
            product_id,
            description: row.get(1)?,
            barcode: row.get(2)?,
            barcodes: row.get(3)?,
            packaging: row.get(4)?,
            branch_id: row.get(5)?,
            stock_qty: row.get(6)?,
            last_sale_date,
            days_without_sale: last_sale_date.map(|d| (today - d).num_days()),
            photo_path: row.get(8)?,
            excluded_at: parse_date(row, 9)?,
            supplier: row.get(10)?,
            department: row.get(11)?,
            section: row.get(12)?,
            status,
        })
    }
}

fn parse_date(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let value: Option<String> = row.get(idx)?;
    value
        .map(|s| {
            NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
            })
        })
        .transpose()
}

impl ProductCatalog for SqliteCatalog {
    fn rows(&self) -> Result<Vec<CatalogRow>, CatalogError> {
        self.rows_as_of(Local::now().date_naive())
    }

    fn product_rows(&self, product_id: ProductId) -> Result<Vec<CatalogRow>, CatalogError> {
        let today = Local::now().date_naive();
        let conn = self.lock()?;

        // Products without stock rows are still returned, as branch 0
        let sql = format!(
            "SELECT {} FROM products p LEFT JOIN stock s ON s.product_id = p.product_id
             WHERE p.product_id = ? ORDER BY s.branch_id",
            ROW_COLUMNS
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![product_id.get()], |row| {
                Self::row_to_catalog_row(row, today)
            })
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| CatalogError::Database(e.to_string()))?);
        }

        if results.is_empty() {
            return Err(CatalogError::NotFound(product_id.to_string()));
        }
        Ok(results)
    }

    fn update_photo_path(
        &self,
        product_id: ProductId,
        photo_path: &str,
    ) -> Result<u64, CatalogError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let affected = tx
            .execute(
                "UPDATE products SET photo_path = ?, updated_at = ? WHERE product_id = ?",
                params![photo_path, Utc::now().to_rfc3339(), product_id.get()],
            )
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        tx.commit()
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        Ok(affected as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> CatalogConfig {
        CatalogConfig {
            branches: vec![1, 2],
            active_within_days: Some(30),
            snapshot_ttl_secs: 300,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn id(raw: i64) -> ProductId {
        ProductId::new(raw).unwrap()
    }

    fn seeded() -> SqliteCatalog {
        let catalog = SqliteCatalog::in_memory(&settings()).unwrap();

        let mut soda = ProductRecord::new(id(10), "REFRIGERANTE COCA COLA 2L PET C/6");
        soda.barcode = Some("7894900011517".to_string());
        soda.barcodes = Some("7894900011517|17894900011514".to_string());
        soda.department = Some("BEBIDAS".to_string());
        catalog.upsert_product(&soda).unwrap();

        let mut rice = ProductRecord::new(id(20), "ARROZ TIPO 1 5KG");
        rice.status = ProductStatus::OutOfLine;
        rice.excluded_at = Some(date(2024, 5, 1));
        catalog.upsert_product(&rice).unwrap();

        catalog.upsert_product(&ProductRecord::new(id(30), "SEM ESTOQUE")).unwrap();

        for (product, branch, qty, sale) in [
            (10, 1, 120.0, Some(date(2024, 6, 10))),
            (10, 2, 30.0, Some(date(2024, 6, 1))),
            // Branch outside the configured set
            (10, 9, 5.0, Some(date(2024, 6, 14))),
            // Last sale outside the activity window
            (20, 1, 40.5, Some(date(2024, 1, 2))),
            (20, 2, 1.0, None),
        ] {
            catalog
                .upsert_stock(&StockRecord {
                    product_id: id(product),
                    branch_id: branch,
                    stock_qty: qty,
                    last_sale_date: sale,
                })
                .unwrap();
        }

        catalog
    }

    #[test]
    fn test_rows_restricted_to_branches_and_activity_window() {
        let catalog = seeded();
        let rows = catalog.rows_as_of(date(2024, 6, 15)).unwrap();

        let keys: Vec<(i64, i64)> = rows
            .iter()
            .map(|r| (r.product_id.get(), r.branch_id))
            .collect();
        assert_eq!(keys, vec![(10, 1), (10, 2)]);

        assert_eq!(rows[0].days_without_sale, Some(5));
        assert_eq!(rows[1].days_without_sale, Some(14));
        assert_eq!(rows[0].barcodes.as_deref(), Some("7894900011517|17894900011514"));
        assert_eq!(rows[0].department.as_deref(), Some("BEBIDAS"));
    }

    #[test]
    fn test_rows_without_restrictions() {
        let catalog = SqliteCatalog::in_memory(&CatalogConfig {
            branches: Vec::new(),
            active_within_days: None,
            snapshot_ttl_secs: 300,
        })
        .unwrap();
        catalog.upsert_product(&ProductRecord::new(id(1), "A")).unwrap();
        for branch in [1, 7] {
            catalog
                .upsert_stock(&StockRecord {
                    product_id: id(1),
                    branch_id: branch,
                    stock_qty: 1.0,
                    last_sale_date: None,
                })
                .unwrap();
        }

        let rows = catalog.rows_as_of(date(2024, 6, 15)).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.days_without_sale.is_none()));
    }

    #[test]
    fn test_product_rows_reads_every_branch() {
        let catalog = seeded();
        let rows = catalog.product_rows(id(20)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status, ProductStatus::OutOfLine);
        assert_eq!(rows[0].excluded_at, Some(date(2024, 5, 1)));
    }

    #[test]
    fn test_product_rows_without_stock() {
        let catalog = seeded();
        let rows = catalog.product_rows(id(30)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].branch_id, 0);
        assert_eq!(rows[0].stock_qty, 0.0);
    }

    #[test]
    fn test_product_rows_not_found() {
        let catalog = seeded();
        let result = catalog.product_rows(id(999));
        assert!(matches!(result, Err(CatalogError::NotFound(_))));
    }

    #[test]
    fn test_update_photo_path() {
        let catalog = seeded();
        let affected = catalog.update_photo_path(id(10), "/srv/images/10.png").unwrap();
        assert_eq!(affected, 1);

        let rows = catalog.product_rows(id(10)).unwrap();
        assert!(rows
            .iter()
            .all(|r| r.photo_path.as_deref() == Some("/srv/images/10.png")));
    }

    #[test]
    fn test_update_photo_path_unknown_product() {
        let catalog = seeded();
        let affected = catalog.update_photo_path(id(999), "/srv/images/999.png").unwrap();
        assert_eq!(affected, 0);
    }

    #[test]
    fn test_upsert_product_replaces_fields() {
        let catalog = seeded();
        let mut soda = ProductRecord::new(id(10), "REFRIGERANTE COCA COLA ZERO");
        soda.supplier = Some("SPAL".to_string());
        catalog.upsert_product(&soda).unwrap();

        let rows = catalog.product_rows(id(10)).unwrap();
        assert_eq!(rows[0].description, "REFRIGERANTE COCA COLA ZERO");
        assert_eq!(rows[0].supplier.as_deref(), Some("SPAL"));
        assert!(rows[0].barcode.is_none());
    }

    #[test]
    fn test_file_backed_catalog_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");

        {
            let catalog = SqliteCatalog::new(&path, &settings()).unwrap();
            catalog.upsert_product(&ProductRecord::new(id(5), "CAFE")).unwrap();
        }

        let catalog = SqliteCatalog::new(&path, &settings()).unwrap();
        assert_eq!(catalog.product_rows(id(5)).unwrap()[0].description, "CAFE");
    }
}
