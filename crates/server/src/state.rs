use std::sync::Arc;
use std::time::Duration;

use gondola_core::{CatalogSnapshot, Config, ImageResolver, SanitizedConfig};

use crate::sessions::SessionRegistry;

/// Shared application state
pub struct AppState {
    config: Config,
    snapshot: Arc<CatalogSnapshot>,
    resolver: Arc<ImageResolver>,
    sessions: SessionRegistry,
}

impl AppState {
    pub fn new(config: Config, snapshot: Arc<CatalogSnapshot>, resolver: Arc<ImageResolver>) -> Self {
        let sessions =
            SessionRegistry::new(Duration::from_secs(config.sessions.idle_timeout_secs));
        Self {
            config,
            snapshot,
            resolver,
            sessions,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    /// Cached catalog projection used for listings and product lookups.
    pub fn snapshot(&self) -> &Arc<CatalogSnapshot> {
        &self.snapshot
    }

    pub fn resolver(&self) -> &ImageResolver {
        self.resolver.as_ref()
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }
}
