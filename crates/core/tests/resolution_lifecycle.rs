//! Image resolution lifecycle integration tests.
//!
//! These tests drive the complete flow a user goes through for one product:
//! list -> search -> pick a candidate -> save -> listing shows the photo

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::routing::get;
use axum::Router;
use chrono::Local;
use tempfile::TempDir;
use tokio::net::TcpListener;

use gondola_core::config::{CatalogConfig, ImageStoreConfig, QuotaConfig};
use gondola_core::{
    testing::{fixtures, MockImageSearcher},
    CatalogFilter, CatalogSnapshot, ImageAcquirer, ImageCandidate, ImageResolver, ImageSearcher,
    PhotoFilter, ProductCatalog, ProductId, ProductRecord, ResolverSettings, SearchStatus,
    SqliteCatalog, StockRecord,
};

/// Test helper wiring a real catalog, a mock provider and a local image origin.
struct TestHarness {
    catalog: Arc<SqliteCatalog>,
    snapshot: Arc<CatalogSnapshot>,
    searcher: Arc<MockImageSearcher>,
    resolver: ImageResolver,
    origin: SocketAddr,
    temp_dir: TempDir,
}

impl TestHarness {
    async fn new(max_calls: u32) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("catalog.db");

        let catalog = Arc::new(
            SqliteCatalog::new(&db_path, &CatalogConfig::default())
                .expect("Failed to create catalog"),
        );
        let snapshot = Arc::new(CatalogSnapshot::new(
            Arc::clone(&catalog) as Arc<dyn ProductCatalog>,
            Duration::from_secs(600),
        ));

        let store = ImageStoreConfig {
            dir: temp_dir.path().join("images"),
            download_timeout_secs: 5,
            max_download_bytes: 1024 * 1024,
        };
        let acquirer = Arc::new(
            ImageAcquirer::new(&store, Arc::clone(&snapshot)).expect("Failed to create acquirer"),
        );

        let searcher = Arc::new(MockImageSearcher::new());
        let resolver = ImageResolver::new(
            Some(Arc::clone(&searcher) as Arc<dyn ImageSearcher>),
            acquirer,
            ResolverSettings {
                max_results: 4,
                description_qualifier: "embalagem".to_string(),
                quota: QuotaConfig {
                    max_calls,
                    window_secs: 3600,
                },
            },
        );

        Self {
            catalog,
            snapshot,
            searcher,
            resolver,
            origin: spawn_origin().await,
            temp_dir,
        }
    }

    fn add_product(&self, id: i64, description: &str, barcodes: Option<&str>) {
        let mut record = ProductRecord::new(product(id), description);
        record.barcodes = barcodes.map(String::from);
        self.catalog.upsert_product(&record).unwrap();
        self.catalog
            .upsert_stock(&StockRecord {
                product_id: product(id),
                branch_id: 1,
                stock_qty: 10.0,
                last_sale_date: Some(Local::now().date_naive()),
            })
            .unwrap();
    }

    fn origin_url(&self, path: &str) -> String {
        format!("http://{}{}", self.origin, path)
    }
}

fn product(id: i64) -> ProductId {
    ProductId::new(id).unwrap()
}

async fn spawn_origin() -> SocketAddr {
    let app = Router::new()
        .route(
            "/candidate.png",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "image/png")],
                    fixtures::png_bytes(40, 30),
                )
            }),
        )
        .route("/gone.png", get(|| async { StatusCode::GONE }));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_search_pick_and_save() {
    let harness = TestHarness::new(100).await;
    harness.add_product(7, "LEITE COND. MOCOCA 395G", Some("7891030300103|12345"));

    let without_photo = CatalogFilter::new().with_photo(PhotoFilter::WithoutPhoto);
    let rows = harness.snapshot.rows().unwrap();
    let pending = without_photo.apply(&rows);
    assert_eq!(pending.len(), 1);

    // The provider finds the product by its only valid barcode
    harness
        .searcher
        .set_outcome(gondola_core::ImageSearchOutcome::Results {
            candidates: vec![ImageCandidate::new(harness.origin_url("/candidate.png"))],
        })
        .await;

    let mut session = harness.resolver.new_session();
    let report = harness.resolver.search(&mut session, &pending[0], None).await;
    assert_eq!(report.status, SearchStatus::Found);
    assert_eq!(report.barcode.as_deref(), Some("7891030300103"));
    assert_eq!(report.quota.used, 1);

    let chosen = report.results[0].link.clone();
    let saved = harness.resolver.save_image(product(7), &chosen).await;
    assert!(saved.success, "{}", saved.message);

    let path = harness.temp_dir.path().join("images").join("7.png");
    assert!(path.exists());
    assert_eq!(saved.path.as_deref(), Some(path.to_string_lossy().as_ref()));

    // The snapshot was invalidated by the save
    let rows = harness.snapshot.rows().unwrap();
    assert!(without_photo.apply(&rows).is_empty());
    assert!(rows[0].has_photo());
}

#[tokio::test]
async fn test_failed_save_keeps_previous_photo() {
    let harness = TestHarness::new(100).await;
    harness.add_product(8, "BISCOITO MARILAN 200G", None);

    let first = harness
        .resolver
        .save_image(product(8), &harness.origin_url("/candidate.png"))
        .await;
    assert!(first.success);

    let second = harness
        .resolver
        .save_image(product(8), &harness.origin_url("/gone.png"))
        .await;
    assert!(!second.success);
    assert!(second.message.contains("410"));

    let rows = harness.catalog.product_rows(product(8)).unwrap();
    assert_eq!(rows[0].photo_path, first.path);
    assert!(harness.temp_dir.path().join("images/8.png").exists());
}

#[tokio::test]
async fn test_quota_window_across_products() {
    let harness = TestHarness::new(2).await;
    for (id, description) in [(1, "AGUA MINERAL 500ML"), (2, "SUCO DEL VALLE 1L"), (3, "CHA LEAO 10UN")] {
        harness.add_product(id, description, None);
    }

    let rows = harness.snapshot.rows().unwrap();
    let mut session = harness.resolver.new_session();

    let mut statuses = Vec::new();
    for row in rows.iter() {
        let report = harness.resolver.search(&mut session, row, None).await;
        statuses.push(report.status);
    }

    assert_eq!(statuses[0], SearchStatus::NoResults);
    assert_eq!(statuses[1], SearchStatus::NoResults);
    assert!(matches!(statuses[2], SearchStatus::QuotaExhausted { .. }));
    assert_eq!(harness.searcher.search_count().await, 2);

    // Earlier answers are still served from the session cache
    let report = harness.resolver.search(&mut session, &rows[0], None).await;
    assert_eq!(report.status, SearchStatus::Cached);

    // A fresh session has its own budget
    let mut other = harness.resolver.new_session();
    let report = harness.resolver.search(&mut other, &rows[2], None).await;
    assert_eq!(report.status, SearchStatus::NoResults);
}
