pub mod acquire;
pub mod barcode;
pub mod catalog;
pub mod config;
pub mod metrics;
pub mod normalize;
pub mod searcher;
pub mod session;
pub mod testing;

pub use acquire::{AcquireError, ImageAcquirer, SavedImage};
pub use barcode::{has_barcode, normalize_barcode, parse_barcodes, primary_barcode, BarcodeSet};
pub use catalog::{
    CatalogError, CatalogFilter, CatalogRow, CatalogSnapshot, CatalogSummary, ExclusionFilter,
    PhotoFilter, ProductCatalog, ProductId, ProductIdError, ProductRecord, ProductStatus,
    SqliteCatalog, StockRecord,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use normalize::{clean_text, CleanupRules};
pub use searcher::{
    CallRecord, GoogleImageSearcher, ImageCandidate, ImageSearchOutcome, ImageSearcher,
    QueryStrategy, QuotaGovernor, QuotaStatus, SearchError, SearchQuery, TransportErrorKind,
};
pub use session::{
    CacheKey, ImageResolver, ImageSession, ResolverSettings, SaveReport, SearchCache,
    SearchReport, SearchStatus,
};
