//! Per-session image resolution.
//!
//! An [`ImageSession`] owns the state one user accumulates while resolving
//! photos: the search cache and the provider call budget. Sessions share
//! nothing. The [`ImageResolver`] is stateless across sessions and is handed
//! the session explicitly on every call.

mod cache;

pub use cache::{CacheKey, SearchCache};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::acquire::ImageAcquirer;
use crate::barcode::normalize_barcode;
use crate::catalog::{CatalogRow, ProductId};
use crate::config::{Config, ImageSearchConfig, QuotaConfig};
use crate::metrics;
use crate::searcher::{
    GoogleImageSearcher, ImageCandidate, ImageSearchOutcome, ImageSearcher, QueryStrategy,
    QuotaGovernor, QuotaStatus, SearchQuery, TransportErrorKind,
};

/// State owned by one user session.
#[derive(Debug, Clone)]
pub struct ImageSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    cache: SearchCache,
    quota: QuotaGovernor,
}

impl ImageSession {
    pub fn new(quota: QuotaGovernor) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            cache: SearchCache::new(),
            quota,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn cache(&self) -> &SearchCache {
        &self.cache
    }

    pub fn quota(&self) -> &QuotaGovernor {
        &self.quota
    }

    pub fn quota_mut(&mut self) -> &mut QuotaGovernor {
        &mut self.quota
    }
}

/// Outcome of a search request as presented to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchStatus {
    /// Served from the session cache; no quota spent.
    Cached,
    Found,
    NoResults,
    QuotaExhausted { minutes_until_reset: i64 },
    ProviderError,
    TransportError { kind: TransportErrorKind },
    NotConfigured,
    NothingToSearch,
}

impl SearchStatus {
    /// Label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cached => "cached",
            Self::Found => "found",
            Self::NoResults => "no_results",
            Self::QuotaExhausted { .. } => "quota_exhausted",
            Self::ProviderError => "provider_error",
            Self::TransportError { .. } => "transport_error",
            Self::NotConfigured => "not_configured",
            Self::NothingToSearch => "nothing_to_search",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::QuotaExhausted { .. }
                | Self::ProviderError
                | Self::TransportError { .. }
                | Self::NotConfigured
        )
    }
}

/// Result of [`ImageResolver::search`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchReport {
    pub product_id: ProductId,
    pub cache_key: CacheKey,
    /// Barcode the search was scoped to, if any.
    pub barcode: Option<String>,
    pub query: Option<String>,
    pub strategy: Option<QueryStrategy>,
    pub status: SearchStatus,
    /// User-visible summary.
    pub message: String,
    pub results: Vec<ImageCandidate>,
    pub quota: QuotaStatus,
}

/// Result of [`ImageResolver::save_image`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveReport {
    pub product_id: ProductId,
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Search settings used by the resolver.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub max_results: u32,
    pub description_qualifier: String,
    pub quota: QuotaConfig,
}

impl ResolverSettings {
    pub fn from_config(config: &Config) -> Self {
        let (max_results, description_qualifier) = match &config.image_search {
            Some(search) => (search.max_results, search.description_qualifier.clone()),
            None => (4, "embalagem".to_string()),
        };
        Self {
            max_results,
            description_qualifier,
            quota: config.quota.clone(),
        }
    }
}

/// Runs image searches and saves on behalf of a session.
pub struct ImageResolver {
    searcher: Option<Arc<dyn ImageSearcher>>,
    acquirer: Arc<ImageAcquirer>,
    settings: ResolverSettings,
}

impl ImageResolver {
    /// Create a resolver. Without a searcher every search reports
    /// [`SearchStatus::NotConfigured`].
    pub fn new(
        searcher: Option<Arc<dyn ImageSearcher>>,
        acquirer: Arc<ImageAcquirer>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            searcher,
            acquirer,
            settings,
        }
    }

    /// Create a resolver with the provider described by `config`.
    ///
    /// A missing or incomplete `image_search` section disables searching
    /// without failing.
    pub fn from_config(config: &Config, acquirer: Arc<ImageAcquirer>) -> Self {
        let searcher = config
            .image_search
            .as_ref()
            .and_then(|search| build_searcher(search));
        Self::new(searcher, acquirer, ResolverSettings::from_config(config))
    }

    pub fn is_search_configured(&self) -> bool {
        self.searcher.is_some()
    }

    pub fn acquirer(&self) -> &Arc<ImageAcquirer> {
        &self.acquirer
    }

    /// Start a session with a fresh cache and a full call budget.
    pub fn new_session(&self) -> ImageSession {
        ImageSession::new(QuotaGovernor::from_config(&self.settings.quota))
    }

    /// Search images for a catalog row.
    ///
    /// `selected_barcode` is used when it is a valid barcode, otherwise the
    /// row's primary barcode. Cached answers are returned without spending
    /// quota. Only provider answers (results or none) are cached, so failed
    /// calls can be retried.
    pub async fn search(
        &self,
        session: &mut ImageSession,
        row: &CatalogRow,
        selected_barcode: Option<&str>,
    ) -> SearchReport {
        let barcode = selected_barcode
            .and_then(normalize_barcode)
            .or_else(|| row.primary_barcode());
        let cache_key = CacheKey::new(row.product_id, barcode.as_deref());
        let query = SearchQuery::build(
            &row.description,
            barcode.as_deref(),
            &self.settings.description_qualifier,
        );

        let mut report = SearchReport {
            product_id: row.product_id,
            cache_key: cache_key.clone(),
            barcode,
            query: query.as_ref().map(|q| q.text.clone()),
            strategy: query.as_ref().map(|q| q.strategy),
            status: SearchStatus::NothingToSearch,
            message: String::new(),
            results: Vec::new(),
            quota: session.quota.status(),
        };

        if let Some(cached) = session.cache.get(&cache_key) {
            metrics::SEARCH_CACHE_HITS.inc();
            debug!(cache_key = %cache_key, results = cached.len(), "Search served from cache");
            report.results = cached.to_vec();
            return finish(report, SearchStatus::Cached, None);
        }

        let Some(searcher) = &self.searcher else {
            warn!(product_id = %row.product_id, "Image search requested but not configured");
            return finish(report, SearchStatus::NotConfigured, None);
        };

        let Some(query) = query else {
            debug!(product_id = %row.product_id, "Nothing to search for");
            return finish(report, SearchStatus::NothingToSearch, None);
        };

        if let Err(wait) = session.quota.try_acquire_at(Utc::now()) {
            metrics::QUOTA_REJECTIONS.inc();
            let minutes_until_reset = (wait.as_secs() as i64 + 59) / 60;
            warn!(
                product_id = %row.product_id,
                minutes_until_reset = minutes_until_reset,
                "Image search quota exhausted"
            );
            report.quota = session.quota.status();
            return finish(
                report,
                SearchStatus::QuotaExhausted {
                    minutes_until_reset,
                },
                None,
            );
        }

        let outcome = searcher
            .search(&query.text, self.settings.max_results)
            .await;
        session
            .quota
            .record_call(&query.text, outcome.candidates().len(), cache_key.as_str());
        report.quota = session.quota.status();

        match outcome {
            ImageSearchOutcome::Results { candidates } => {
                info!(
                    product_id = %row.product_id,
                    cache_key = %cache_key,
                    query = %query.text,
                    results = candidates.len(),
                    "Image search found candidates"
                );
                session.cache.put(cache_key, candidates.clone());
                report.results = candidates;
                finish(report, SearchStatus::Found, None)
            }
            ImageSearchOutcome::Empty => {
                info!(
                    product_id = %row.product_id,
                    cache_key = %cache_key,
                    query = %query.text,
                    results = 0,
                    "Image search found nothing"
                );
                session.cache.put(cache_key, Vec::new());
                finish(report, SearchStatus::NoResults, None)
            }
            ImageSearchOutcome::ProviderError { message } => {
                warn!(
                    product_id = %row.product_id,
                    query = %query.text,
                    error = %message,
                    "Image search provider returned an error"
                );
                finish(report, SearchStatus::ProviderError, Some(message))
            }
            ImageSearchOutcome::TransportError { kind } => {
                warn!(
                    product_id = %row.product_id,
                    query = %query.text,
                    error = %kind,
                    "Image search request failed"
                );
                finish(report, SearchStatus::TransportError { kind }, None)
            }
        }
    }

    /// Download `url` and register it as the image of `product_id`.
    ///
    /// Failures are reported, never propagated.
    pub async fn save_image(&self, product_id: ProductId, url: &str) -> SaveReport {
        let url = url.trim();
        if url.is_empty() {
            return SaveReport {
                product_id,
                success: false,
                message: "No image link was given.".to_string(),
                path: None,
            };
        }

        match self.acquirer.save(product_id, url).await {
            Ok(saved) => {
                metrics::IMAGE_SAVES.with_label_values(&["success"]).inc();
                SaveReport {
                    product_id,
                    success: true,
                    message: format!("Image saved for product {}.", product_id),
                    path: Some(saved.path),
                }
            }
            Err(e) => {
                metrics::IMAGE_SAVES.with_label_values(&[e.label()]).inc();
                warn!(
                    product_id = %product_id,
                    url = url,
                    error = %e,
                    orphaned_file = e.leaves_orphan(),
                    "Failed to save product image"
                );
                SaveReport {
                    product_id,
                    success: false,
                    message: e.user_message(),
                    path: None,
                }
            }
        }
    }

    /// Forget every cached search of the session.
    pub fn reset(&self, session: &mut ImageSession) {
        let cleared = session.cache.len();
        session.cache.clear();
        debug!(session_id = %session.id, cleared = cleared, "Search cache cleared");
    }
}

fn build_searcher(config: &ImageSearchConfig) -> Option<Arc<dyn ImageSearcher>> {
    match GoogleImageSearcher::new(config.clone()) {
        Ok(searcher) => Some(Arc::new(searcher)),
        Err(e) => {
            warn!(error = %e, "Image search disabled");
            None
        }
    }
}

fn finish(
    mut report: SearchReport,
    status: SearchStatus,
    provider_message: Option<String>,
) -> SearchReport {
    metrics::IMAGE_SEARCHES
        .with_label_values(&[status.label()])
        .inc();
    report.message = status_message(&status, report.results.len(), provider_message.as_deref());
    report.status = status;
    report
}

fn status_message(status: &SearchStatus, results: usize, provider_message: Option<&str>) -> String {
    match status {
        SearchStatus::Cached => format!("{} image(s) from earlier search.", results),
        SearchStatus::Found => format!("{} image(s) found.", results),
        SearchStatus::NoResults => "No images found for this product.".to_string(),
        SearchStatus::QuotaExhausted {
            minutes_until_reset,
        } => format!(
            "Search limit reached. Try again in {} minute(s).",
            minutes_until_reset
        ),
        SearchStatus::ProviderError => format!(
            "Image search error: {}",
            provider_message.unwrap_or("unknown provider error")
        ),
        SearchStatus::TransportError { kind } => kind.user_message(),
        SearchStatus::NotConfigured => {
            "Image search is not configured. Set the API key and search engine id.".to_string()
        }
        SearchStatus::NothingToSearch => {
            "This product has no barcode or description to search with.".to_string()
        }
    }
}
