use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::middleware::metrics_middleware;
use super::{handlers, products, sessions};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Sessions
        .route(
            "/sessions",
            post(sessions::create_session).delete(sessions::close_session),
        )
        .route("/session/quota", get(sessions::get_quota))
        .route("/session/cache", delete(sessions::clear_cache))
        // Catalog
        .route("/products", get(products::list_products))
        .route("/products/refresh", post(products::refresh_products))
        .route("/products/{id}", get(products::get_product))
        // Image resolution
        .route("/products/{id}/image-search", post(products::search_images))
        .route("/products/{id}/image", post(products::save_image))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
