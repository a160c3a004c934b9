//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Image search (outcomes, cache hits, quota rejections, provider latency)
//! - Image acquisition (saves by result)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Image Search
// =============================================================================

/// Image search requests by outcome.
pub static IMAGE_SEARCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "gondola_image_searches_total",
            "Total image search requests",
        ),
        // "cached", "found", "no_results", "quota_exhausted", "provider_error",
        // "transport_error", "not_configured", "nothing_to_search"
        &["outcome"],
    )
    .unwrap()
});

/// Searches answered from the session cache.
pub static SEARCH_CACHE_HITS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "gondola_search_cache_hits_total",
        "Image searches answered from the session cache",
    )
    .unwrap()
});

/// Searches refused by the quota governor.
pub static QUOTA_REJECTIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "gondola_quota_rejections_total",
        "Image searches refused because the call budget was exhausted",
    )
    .unwrap()
});

/// Provider request duration in seconds.
pub static PROVIDER_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "gondola_provider_request_duration_seconds",
            "Duration of image search provider requests",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["outcome"],
    )
    .unwrap()
});

// =============================================================================
// Image Acquisition
// =============================================================================

/// Image saves by result.
pub static IMAGE_SAVES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("gondola_image_saves_total", "Total image save attempts"),
        // "success", "download_failed", "invalid_image", "store_failed", "catalog_failed"
        &["result"],
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(IMAGE_SEARCHES.clone()),
        Box::new(SEARCH_CACHE_HITS.clone()),
        Box::new(QUOTA_REJECTIONS.clone()),
        Box::new(PROVIDER_REQUEST_DURATION.clone()),
        Box::new(IMAGE_SAVES.clone()),
    ]
}
