//! Mock image searcher for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

use crate::searcher::{ImageCandidate, ImageSearchOutcome, ImageSearcher};

/// A recorded search for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedSearch {
    /// The query text that was searched.
    pub query: String,
    pub max_results: u32,
    /// When the search was made.
    pub timestamp: Instant,
}

/// A query handler that produces outcomes dynamically based on the query.
type QueryHandler = Box<dyn Fn(&str) -> Option<ImageSearchOutcome> + Send + Sync>;

/// Mock implementation of the ImageSearcher trait.
///
/// Outcomes are resolved in this order: a queued one-shot outcome, the query
/// handler, then the default outcome. `Results` are truncated to the
/// requested count like a real provider.
///
/// # Example
///
/// ```rust,ignore
/// use gondola_core::testing::{MockImageSearcher, fixtures};
///
/// let searcher = MockImageSearcher::with_candidates(vec![
///     fixtures::image_candidate(1),
///     fixtures::image_candidate(2),
/// ]);
///
/// let outcome = searcher.search("\"7894900011517\"", 4).await;
/// assert_eq!(outcome.candidates().len(), 2);
/// assert_eq!(searcher.search_count().await, 1);
/// ```
pub struct MockImageSearcher {
    default_outcome: Arc<RwLock<ImageSearchOutcome>>,
    queued: Arc<RwLock<VecDeque<ImageSearchOutcome>>>,
    searches: Arc<RwLock<Vec<RecordedSearch>>>,
    query_handler: Arc<RwLock<Option<QueryHandler>>>,
}

impl std::fmt::Debug for MockImageSearcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockImageSearcher")
            .field("default_outcome", &"<outcome>")
            .field("queued", &"<queued>")
            .field("searches", &"<searches>")
            .field("query_handler", &"<handler>")
            .finish()
    }
}

impl Default for MockImageSearcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockImageSearcher {
    /// Create a mock searcher that finds nothing.
    pub fn new() -> Self {
        Self::with_outcome(ImageSearchOutcome::Empty)
    }

    /// Create a mock searcher that always answers with `outcome`.
    pub fn with_outcome(outcome: ImageSearchOutcome) -> Self {
        Self {
            default_outcome: Arc::new(RwLock::new(outcome)),
            queued: Arc::new(RwLock::new(VecDeque::new())),
            searches: Arc::new(RwLock::new(Vec::new())),
            query_handler: Arc::new(RwLock::new(None)),
        }
    }

    /// Create a mock searcher that always finds `candidates`.
    pub fn with_candidates(candidates: Vec<ImageCandidate>) -> Self {
        Self::with_outcome(ImageSearchOutcome::Results { candidates })
    }

    /// Set the outcome for subsequent searches.
    pub async fn set_outcome(&self, outcome: ImageSearchOutcome) {
        *self.default_outcome.write().await = outcome;
    }

    /// Answer the next search with `outcome`, once.
    pub async fn push_outcome(&self, outcome: ImageSearchOutcome) {
        self.queued.write().await.push_back(outcome);
    }

    /// Set a handler that picks the outcome from the query text.
    ///
    /// Returning `None` falls through to the default outcome.
    pub async fn set_query_handler<F>(&self, handler: F)
    where
        F: Fn(&str) -> Option<ImageSearchOutcome> + Send + Sync + 'static,
    {
        *self.query_handler.write().await = Some(Box::new(handler));
    }

    /// Get recorded searches.
    pub async fn recorded_searches(&self) -> Vec<RecordedSearch> {
        self.searches.read().await.clone()
    }

    /// Get the number of searches performed.
    pub async fn search_count(&self) -> usize {
        self.searches.read().await.len()
    }
}

#[async_trait]
impl ImageSearcher for MockImageSearcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, query: &str, max_results: u32) -> ImageSearchOutcome {
        self.searches.write().await.push(RecordedSearch {
            query: query.to_string(),
            max_results,
            timestamp: Instant::now(),
        });

        let queued = self.queued.write().await.pop_front();
        let outcome = match queued {
            Some(outcome) => outcome,
            None => {
                let handler = self.query_handler.read().await;
                match handler.as_ref().and_then(|h| h(query)) {
                    Some(outcome) => outcome,
                    None => self.default_outcome.read().await.clone(),
                }
            }
        };

        match outcome {
            ImageSearchOutcome::Results { candidates } => {
                let candidates: Vec<_> = candidates.into_iter().take(max_results as usize).collect();
                if candidates.is_empty() {
                    ImageSearchOutcome::Empty
                } else {
                    ImageSearchOutcome::Results { candidates }
                }
            }
            other => other,
        }
    }
}
