//! Product catalog and image resolution handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use gondola_core::{
    BarcodeSet, CatalogError, CatalogFilter, CatalogRow, CatalogSummary, ExclusionFilter,
    PhotoFilter, ProductId, ProductStatus, SaveReport, SearchReport,
};

use super::error::{api_error, ApiError};
use super::sessions::CurrentSession;
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

/// Listing filters. List-valued filters are comma separated.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQueryParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub min_days_without_sale: Option<i64>,
    #[serde(default)]
    pub photo: Option<PhotoFilter>,
    #[serde(default)]
    pub exclusion: Option<ExclusionFilter>,
}

impl ProductQueryParams {
    pub fn into_filter(self) -> Result<CatalogFilter, String> {
        let branches = split_list(self.branch.as_deref())
            .map(|b| {
                b.parse::<i64>()
                    .map_err(|_| format!("Invalid branch: {}", b))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let statuses = split_list(self.status.as_deref())
            .map(|s| s.parse::<ProductStatus>().map_err(|e| e.to_string()))
            .collect::<Result<Vec<_>, _>>()?;

        let departments = split_list(self.department.as_deref())
            .map(String::from)
            .collect();

        Ok(CatalogFilter {
            code: self.code,
            barcode: self.barcode,
            description: self.description,
            branches,
            statuses,
            departments,
            min_days_without_sale: self.min_days_without_sale,
            photo: self.photo.unwrap_or_default(),
            exclusion: self.exclusion.unwrap_or_default(),
        })
    }
}

fn split_list(value: Option<&str>) -> impl Iterator<Item = &str> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub rows: Vec<CatalogRow>,
    pub summary: CatalogSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductDetailResponse {
    pub product_id: ProductId,
    pub description: String,
    pub primary_barcode: Option<String>,
    pub barcodes: BarcodeSet,
    /// One row per branch.
    pub rows: Vec<CatalogRow>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub cleared_searches: usize,
}

#[derive(Debug, Deserialize)]
pub struct ImageSearchRequest {
    /// Barcode picked by the user among the product's barcodes.
    #[serde(default)]
    pub barcode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SaveImageRequest {
    pub url: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/products
///
/// Filtered catalog listing. A catalog failure yields an empty listing with
/// the error attached.
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProductQueryParams>,
) -> Result<Json<ProductListResponse>, (StatusCode, Json<ProductListResponse>)> {
    let filter = match params.into_filter() {
        Ok(filter) => filter,
        Err(e) => return Err((StatusCode::BAD_REQUEST, Json(empty_listing(e)))),
    };

    match state.snapshot().load().await {
        Ok(rows) => {
            let rows = filter.apply(&rows);
            let summary = CatalogSummary::from_rows(&rows);
            Ok(Json(ProductListResponse {
                rows,
                summary,
                error: None,
            }))
        }
        Err(e) => {
            warn!(error = %e, "Catalog query failed");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(empty_listing(format!("Could not load the catalog: {}", e))),
            ))
        }
    }
}

fn empty_listing(error: String) -> ProductListResponse {
    ProductListResponse {
        rows: Vec::new(),
        summary: CatalogSummary::from_rows(&[]),
        error: Some(error),
    }
}

/// POST /api/v1/products/refresh
///
/// Reload the catalog on next read and forget the session's cached searches.
pub async fn refresh_products(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
) -> Json<RefreshResponse> {
    state.snapshot().invalidate();

    let mut session = current.session.lock().await;
    let cleared_searches = session.cache().len();
    state.resolver().reset(&mut session);

    info!(session_id = %current.id, cleared_searches, "Catalog refresh requested");
    Json(RefreshResponse { cleared_searches })
}

/// GET /api/v1/products/{id}
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProductDetailResponse>, ApiError> {
    let product_id = parse_product_id(&id)?;
    let rows = load_product(&state, product_id).await?;

    let first = &rows[0];
    let barcodes = first.barcode_set();
    Ok(Json(ProductDetailResponse {
        product_id,
        description: first.description.clone(),
        primary_barcode: barcodes.primary.clone(),
        barcodes,
        rows,
    }))
}

/// POST /api/v1/products/{id}/image-search
///
/// Search images for the product within the caller's session. Soft failures
/// (quota, provider, nothing found) are reported in the body's `status`.
pub async fn search_images(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    current: CurrentSession,
    Json(request): Json<ImageSearchRequest>,
) -> Result<Json<SearchReport>, ApiError> {
    let product_id = parse_product_id(&id)?;
    let rows = load_product(&state, product_id).await?;

    let mut session = current.session.lock().await;
    let report = state
        .resolver()
        .search(&mut session, &rows[0], request.barcode.as_deref())
        .await;

    Ok(Json(report))
}

/// POST /api/v1/products/{id}/image
///
/// Download the chosen candidate and register it as the product's photo.
pub async fn save_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<SaveImageRequest>,
) -> Result<Json<SaveReport>, ApiError> {
    let product_id = parse_product_id(&id)?;
    Ok(Json(state.resolver().save_image(product_id, &request.url).await))
}

fn parse_product_id(raw: &str) -> Result<ProductId, ApiError> {
    ProductId::parse(raw).map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))
}

async fn load_product(
    state: &AppState,
    product_id: ProductId,
) -> Result<Vec<CatalogRow>, ApiError> {
    match state.snapshot().product_rows(product_id).await {
        Ok(rows) if !rows.is_empty() => Ok(rows),
        Ok(_) | Err(CatalogError::NotFound(_)) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Product not found: {}", product_id),
        )),
        Err(e) => {
            warn!(product_id = %product_id, error = %e, "Catalog lookup failed");
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Could not load product {}: {}", product_id, e),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_params_into_filter() {
        let params = ProductQueryParams {
            branch: Some("1, 3".to_string()),
            status: Some("active,out_of_line".to_string()),
            department: Some("BEBIDAS".to_string()),
            photo: Some(PhotoFilter::WithoutPhoto),
            ..Default::default()
        };

        let filter = params.into_filter().unwrap();
        assert_eq!(filter.branches, vec![1, 3]);
        assert_eq!(
            filter.statuses,
            vec![ProductStatus::Active, ProductStatus::OutOfLine]
        );
        assert_eq!(filter.departments, vec!["BEBIDAS".to_string()]);
        assert_eq!(filter.photo, PhotoFilter::WithoutPhoto);
        assert_eq!(filter.exclusion, ExclusionFilter::All);
    }

    #[test]
    fn test_query_params_reject_bad_branch() {
        let params = ProductQueryParams {
            branch: Some("1,north".to_string()),
            ..Default::default()
        };
        assert_eq!(params.into_filter().unwrap_err(), "Invalid branch: north");
    }

    #[test]
    fn test_query_params_reject_bad_status() {
        let params = ProductQueryParams {
            status: Some("discontinued".to_string()),
            ..Default::default()
        };
        assert!(params.into_filter().is_err());
    }

    #[test]
    fn test_parse_product_id_accepts_float_artifact() {
        assert_eq!(parse_product_id("42.0").unwrap().get(), 42);
        assert_eq!(parse_product_id("abc").unwrap_err().0, StatusCode::BAD_REQUEST);
    }
}
