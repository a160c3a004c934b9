//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! backed by a temporary SQLite catalog, a mock image search provider and a
//! local image origin, enabling E2E testing without external infrastructure.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use chrono::{Days, Local};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tower::ServiceExt;

use gondola_core::config::{CatalogConfig, ImageStoreConfig, QuotaConfig};
use gondola_core::testing::MockImageSearcher;
use gondola_core::{
    CatalogSnapshot, ImageAcquirer, ImageResolver, ImageSearcher, ProductCatalog, ProductId,
    ProductRecord, ResolverSettings, SqliteCatalog, StockRecord,
};
use gondola_server::api::SESSION_HEADER;

/// Re-export fixtures for test convenience
pub use gondola_core::testing::fixtures;

/// Test fixture for E2E testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_search() {
///     let fixture = TestFixture::new().await;
///     let session = fixture.open_session().await;
///
///     let response = fixture
///         .post_in(&session, "/api/v1/products/100/image-search", json!({}))
///         .await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock image search provider - configure outcomes
    pub searcher: Arc<MockImageSearcher>,
    /// Catalog seeded with [`seed_catalog`] data
    pub catalog: Arc<SqliteCatalog>,
    /// Local server serving image downloads
    pub origin: SocketAddr,
    /// Temporary directory for the database and saved images
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Wire the mock provider; without it searches report "not configured"
    pub search_configured: bool,
    pub quota_max_calls: u32,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            search_configured: true,
            quota_max_calls: 100,
        }
    }
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let catalog_config = CatalogConfig {
            branches: vec![1, 2],
            ..Default::default()
        };
        let catalog = Arc::new(
            SqliteCatalog::new(&db_path, &catalog_config).expect("Failed to create catalog"),
        );
        seed_catalog(&catalog);

        let snapshot = Arc::new(CatalogSnapshot::new(
            Arc::clone(&catalog) as Arc<dyn ProductCatalog>,
            Duration::from_secs(300),
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
        let provider = test_config
            .search_configured
            .then(|| Arc::clone(&searcher) as Arc<dyn ImageSearcher>);
        let settings = ResolverSettings {
            max_results: 4,
            description_qualifier: "embalagem".to_string(),
            quota: QuotaConfig {
                max_calls: test_config.quota_max_calls,
                window_secs: 3600,
            },
        };
        let resolver = Arc::new(ImageResolver::new(provider, acquirer, settings));

        let state = Arc::new(gondola_server::state::AppState::new(
            Default::default(),
            snapshot,
            resolver,
        ));
        let router = gondola_server::api::create_router(state);

        let origin = spawn_origin().await;

        Self {
            router,
            searcher,
            catalog,
            origin,
            temp_dir,
        }
    }

    /// URL of a file on the local image origin.
    pub fn origin_url(&self, path: &str) -> String {
        format!("http://{}{}", self.origin, path)
    }

    /// Open a session and return its id.
    pub async fn open_session(&self) -> String {
        let response = self.post("/api/v1/sessions", Value::Null).await;
        assert_eq!(response.status, StatusCode::CREATED);
        response.body["session_id"]
            .as_str()
            .expect("session_id missing")
            .to_string()
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, None).await
    }

    /// Send a GET request within a session.
    pub async fn get_in(&self, session: &str, path: &str) -> TestResponse {
        self.request("GET", path, None, Some(session)).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), None).await
    }

    /// Send a POST request with JSON body within a session.
    pub async fn post_in(&self, session: &str, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), Some(session)).await
    }

    /// Send a DELETE request within a session.
    pub async fn delete_in(&self, session: &str, path: &str) -> TestResponse {
        self.request("DELETE", path, None, Some(session)).await
    }

    /// Send a raw request and return the status and body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    /// Send a request to the test server.
    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        session: Option<&str>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        if let Some(session) = session {
            request_builder = request_builder.header(SESSION_HEADER, session);
        }

        let body = match body {
            Some(Value::Null) | None => Body::empty(),
            Some(json_body) => {
                request_builder = request_builder.header("Content-Type", "application/json");
                Body::from(serde_json::to_vec(&json_body).unwrap())
            }
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Load the fixture catalog.
///
/// - 100: coffee with two barcodes, stocked in branches 1 and 2
/// - 200: rice without barcodes, already photographed
/// - 300: soap sold in branch 3 only (outside the configured branches)
pub fn seed_catalog(catalog: &SqliteCatalog) {
    let recent = Local::now()
        .date_naive()
        .checked_sub_days(Days::new(5))
        .unwrap();

    let mut coffee = ProductRecord::new(product(100), "CAFE PILAO TRAD. 500G");
    coffee.barcode = Some("7896089011916".to_string());
    coffee.barcodes = Some("7896089011916|17896089011913".to_string());
    coffee.department = Some("MERCEARIA".to_string());

    let mut rice = ProductRecord::new(product(200), "ARROZ TIO JOAO 5KG");
    rice.photo_path = Some("/srv/images/200.png".to_string());
    rice.department = Some("MERCEARIA".to_string());

    let mut soap = ProductRecord::new(product(300), "SABONETE DOVE 90G");
    soap.barcode = Some("7891150027848".to_string());
    soap.department = Some("HIGIENE".to_string());

    for record in [&coffee, &rice, &soap] {
        catalog.upsert_product(record).expect("Failed to seed product");
    }

    for (id, branch, qty) in [(100, 1, 24.0), (100, 2, 6.0), (200, 1, 50.0), (300, 3, 12.0)] {
        catalog
            .upsert_stock(&StockRecord {
                product_id: product(id),
                branch_id: branch,
                stock_qty: qty,
                last_sale_date: Some(recent),
            })
            .expect("Failed to seed stock");
    }
}

pub fn product(id: i64) -> ProductId {
    ProductId::new(id).expect("valid product id")
}

/// Serve fixture images on an ephemeral local port.
async fn spawn_origin() -> SocketAddr {
    let app = Router::new()
        .route(
            "/photo.jpg",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "image/jpeg")],
                    fixtures::jpeg_bytes(32, 24),
                )
            }),
        )
        .route(
            "/page.html",
            get(|| async { ([(header::CONTENT_TYPE, "text/html")], "<html></html>") }),
        )
        .route("/missing.jpg", get(|| async { StatusCode::NOT_FOUND }));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind origin");
    let addr = listener.local_addr().expect("origin address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    addr
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
