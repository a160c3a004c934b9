//! Google Custom Search image backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::ImageSearchConfig;
use crate::metrics;

use super::{ImageCandidate, ImageSearchOutcome, ImageSearcher, SearchError, TransportErrorKind};

/// Image search against the Custom Search JSON API.
pub struct GoogleImageSearcher {
    client: Client,
    config: ImageSearchConfig,
}

impl GoogleImageSearcher {
    /// Create a searcher. Fails without a complete credential pair.
    pub fn new(config: ImageSearchConfig) -> Result<Self, SearchError> {
        if config.api_key.trim().is_empty() {
            return Err(SearchError::NotConfigured("API key is empty".to_string()));
        }
        if config.engine_id.trim().is_empty() {
            return Err(SearchError::NotConfigured(
                "search engine id is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SearchError::Client(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn query_params(&self, query: &str, max_results: u32) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", query.to_string()),
            ("cx", self.config.engine_id.clone()),
            ("key", self.config.api_key.clone()),
            ("searchType", "image".to_string()),
            ("num", max_results.clamp(1, 10).to_string()),
            ("fileType", self.config.file_types.clone()),
            ("gl", self.config.region.clone()),
            ("hl", self.config.language.clone()),
        ];
        if self.config.safe_search {
            params.push(("safe", "active".to_string()));
        }
        params
    }
}

#[async_trait]
impl ImageSearcher for GoogleImageSearcher {
    fn name(&self) -> &str {
        "google"
    }

    async fn search(&self, query: &str, max_results: u32) -> ImageSearchOutcome {
        debug!(query = query, max_results = max_results, "Searching images");
        let started = Instant::now();

        let outcome = match self
            .client
            .get(&self.config.endpoint)
            .query(&self.query_params(query, max_results))
            .send()
            .await
        {
            Ok(response) => {
                let status = response.status().as_u16();
                match response.text().await {
                    Ok(body) => map_response(status, &body, max_results),
                    Err(e) => ImageSearchOutcome::TransportError {
                        kind: classify_transport_error(&e),
                    },
                }
            }
            Err(e) => ImageSearchOutcome::TransportError {
                kind: classify_transport_error(&e),
            },
        };

        metrics::PROVIDER_REQUEST_DURATION
            .with_label_values(&[outcome.label()])
            .observe(started.elapsed().as_secs_f64());
        debug!(
            query = query,
            outcome = outcome.label(),
            results = outcome.candidates().len(),
            "Image search finished"
        );

        outcome
    }
}

fn classify_transport_error(e: &reqwest::Error) -> TransportErrorKind {
    if e.is_timeout() {
        TransportErrorKind::Timeout
    } else if let Some(status) = e.status() {
        TransportErrorKind::HttpStatus(status.as_u16())
    } else if e.is_decode() || e.is_body() {
        TransportErrorKind::Decode(e.to_string())
    } else {
        TransportErrorKind::Connection(e.to_string())
    }
}

/// Map a provider answer to an outcome.
///
/// A structured error wins over the status code. Non-2xx answers without one
/// are transport failures; 2xx answers without items are empty.
pub fn map_response(status: u16, body: &str, max_results: u32) -> ImageSearchOutcome {
    let parsed: Result<GoogleResponse, _> = serde_json::from_str(body);
    let success = (200..300).contains(&status);

    match parsed {
        Ok(GoogleResponse {
            error: Some(error), ..
        }) => ImageSearchOutcome::ProviderError {
            message: error
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| format!("provider error (HTTP {})", status)),
        },
        _ if !success => ImageSearchOutcome::TransportError {
            kind: TransportErrorKind::HttpStatus(status),
        },
        Ok(GoogleResponse { items, .. }) => {
            let candidates: Vec<ImageCandidate> = items
                .unwrap_or_default()
                .into_iter()
                .filter_map(GoogleItem::into_candidate)
                .take(max_results as usize)
                .collect();
            if candidates.is_empty() {
                ImageSearchOutcome::Empty
            } else {
                ImageSearchOutcome::Results { candidates }
            }
        }
        Err(e) => ImageSearchOutcome::TransportError {
            kind: TransportErrorKind::Decode(e.to_string()),
        },
    }
}

// Custom Search API response types

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    items: Option<Vec<GoogleItem>>,
    #[serde(default)]
    error: Option<GoogleError>,
}

#[derive(Debug, Deserialize)]
struct GoogleItem {
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    image: Option<GoogleImageInfo>,
}

impl GoogleItem {
    fn into_candidate(self) -> Option<ImageCandidate> {
        let link = self.link.filter(|l| !l.trim().is_empty())?;
        let thumbnail = self
            .thumbnail
            .or_else(|| self.image.and_then(|i| i.thumbnail_link));
        Some(ImageCandidate { link, thumbnail })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleImageInfo {
    #[serde(default)]
    thumbnail_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: Option<String>,
}
