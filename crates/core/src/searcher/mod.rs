//! Image search abstraction.
//!
//! This module provides an `ImageSearcher` trait over external image search
//! providers, the query builder that feeds it and the call budget that
//! gates it.

mod google;
mod query;
mod quota;
mod types;

pub use google::{map_response, GoogleImageSearcher};
pub use query::{QueryStrategy, SearchQuery};
pub use quota::{CallRecord, QuotaGovernor, QuotaStatus};
pub use types::*;
