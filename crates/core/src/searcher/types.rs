//! Types for the image search system.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One candidate image returned by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCandidate {
    /// Full-size image URL.
    pub link: String,
    /// Thumbnail URL, when the provider supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl ImageCandidate {
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            thumbnail: None,
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }
}

/// Network-level failure classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum TransportErrorKind {
    Timeout,
    /// Non-2xx response without a structured provider error.
    HttpStatus(u16),
    Connection(String),
    /// 2xx response whose body could not be read as JSON.
    Decode(String),
}

impl TransportErrorKind {
    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Timeout => "The image search took too long to respond. Try again.".to_string(),
            Self::HttpStatus(status) => {
                format!("The image search service answered with HTTP {}.", status)
            }
            Self::Connection(_) => {
                "Could not reach the image search service. Check the connection.".to_string()
            }
            Self::Decode(_) => "The image search service sent an unreadable response.".to_string(),
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::HttpStatus(status) => write!(f, "http status {}", status),
            Self::Connection(detail) => write!(f, "connection failed: {}", detail),
            Self::Decode(detail) => write!(f, "decode failed: {}", detail),
        }
    }
}

/// Result of one provider call.
///
/// Every shape the provider can answer with maps to exactly one variant, so
/// callers handle all of them without inspecting payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ImageSearchOutcome {
    /// At least one candidate, truncated to the requested count.
    Results { candidates: Vec<ImageCandidate> },
    /// The provider answered without items and without an error.
    Empty,
    /// The provider answered with a structured error.
    ProviderError { message: String },
    /// The call failed before a usable answer arrived.
    TransportError { kind: TransportErrorKind },
}

impl ImageSearchOutcome {
    /// Candidates carried by this outcome. Failures carry none.
    pub fn candidates(&self) -> &[ImageCandidate] {
        match self {
            Self::Results { candidates } => candidates,
            _ => &[],
        }
    }

    /// Whether the provider actually answered the query.
    pub fn is_answer(&self) -> bool {
        matches!(self, Self::Results { .. } | Self::Empty)
    }

    /// Label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Results { .. } => "results",
            Self::Empty => "empty",
            Self::ProviderError { .. } => "provider_error",
            Self::TransportError { .. } => "transport_error",
        }
    }
}

/// Errors creating a search client.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Image search is not configured: {0}")]
    NotConfigured(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Trait for image search backends.
#[async_trait]
pub trait ImageSearcher: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Search for images. Never fails; failures are outcome variants.
    async fn search(&self, query: &str, max_results: u32) -> ImageSearchOutcome;
}
