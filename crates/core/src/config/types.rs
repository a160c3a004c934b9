use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub image_search: Option<ImageSearchConfig>,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub images: ImageStoreConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// Native client library directory required by some catalog drivers.
    /// Only checked for existence; a missing directory is a warning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_client_path: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            native_client_path: None,
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("gondola.db")
}

/// Catalog snapshot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Branches included in the snapshot. Empty means every branch.
    #[serde(default = "default_branches")]
    pub branches: Vec<i64>,
    /// Only products sold within this many days are listed.
    #[serde(default = "default_active_within_days")]
    pub active_within_days: Option<u32>,
    /// How long a catalog snapshot is served before it is re-read.
    #[serde(default = "default_snapshot_ttl")]
    pub snapshot_ttl_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            branches: default_branches(),
            active_within_days: default_active_within_days(),
            snapshot_ttl_secs: default_snapshot_ttl(),
        }
    }
}

fn default_branches() -> Vec<i64> {
    vec![1, 2, 3]
}

fn default_active_within_days() -> Option<u32> {
    Some(300)
}

fn default_snapshot_ttl() -> u64 {
    300
}

/// Image search provider configuration (Google Custom Search JSON API)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageSearchConfig {
    /// Provider API key. Missing or blank disables image search.
    #[serde(default)]
    pub api_key: String,
    /// Search engine id (`cx`)
    #[serde(default)]
    pub engine_id: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_language")]
    pub language: String,
    /// Comma separated list of accepted file types
    #[serde(default = "default_file_types")]
    pub file_types: String,
    #[serde(default = "default_true")]
    pub safe_search: bool,
    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
    /// Candidates requested per search (default: 4)
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    /// Term appended to description-based queries
    #[serde(default = "default_qualifier")]
    pub description_qualifier: String,
}

impl ImageSearchConfig {
    /// Both halves of the credential pair are present.
    pub fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.engine_id.trim().is_empty()
    }
}

fn default_endpoint() -> String {
    "https://www.googleapis.com/customsearch/v1".to_string()
}

fn default_region() -> String {
    "br".to_string()
}

fn default_language() -> String {
    "pt".to_string()
}

fn default_file_types() -> String {
    "jpg,png,jpeg".to_string()
}

fn default_true() -> bool {
    true
}

fn default_search_timeout() -> u64 {
    10
}

fn default_max_results() -> u32 {
    4
}

fn default_qualifier() -> String {
    "embalagem".to_string()
}

/// Search quota configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuotaConfig {
    /// Provider calls allowed per window (default: 100)
    #[serde(default = "default_max_calls")]
    pub max_calls: u32,
    /// Window length in seconds (default: one hour)
    #[serde(default = "default_window")]
    pub window_secs: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            max_calls: default_max_calls(),
            window_secs: default_window(),
        }
    }
}

fn default_max_calls() -> u32 {
    100
}

fn default_window() -> u64 {
    3600
}

/// Durable image store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageStoreConfig {
    #[serde(default = "default_images_dir")]
    pub dir: PathBuf,
    /// Download timeout in seconds (default: 15)
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
    #[serde(default = "default_max_download_bytes")]
    pub max_download_bytes: u64,
}

impl Default for ImageStoreConfig {
    fn default() -> Self {
        Self {
            dir: default_images_dir(),
            download_timeout_secs: default_download_timeout(),
            max_download_bytes: default_max_download_bytes(),
        }
    }
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("images")
}

fn default_download_timeout() -> u64 {
    15
}

fn default_max_download_bytes() -> u64 {
    10 * 1024 * 1024
}

/// Session lifecycle configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Sessions unused for this long are closed (default: 4 hours)
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    /// How often idle sessions are swept (default: 5 minutes)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_idle_timeout() -> u64 {
    4 * 3600
}

fn default_sweep_interval() -> u64 {
    300
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

fn default_log_filter() -> String {
    "info,tower_http=debug".to_string()
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub catalog: CatalogConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_search: Option<SanitizedImageSearchConfig>,
    pub quota: QuotaConfig,
    pub images: ImageStoreConfig,
    pub sessions: SessionConfig,
}

/// Sanitized image search config (credentials hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedImageSearchConfig {
    pub endpoint: String,
    pub api_key_configured: bool,
    pub engine_id_configured: bool,
    pub region: String,
    pub language: String,
    pub timeout_secs: u64,
    pub max_results: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            catalog: config.catalog.clone(),
            image_search: config
                .image_search
                .as_ref()
                .map(|s| SanitizedImageSearchConfig {
                    endpoint: s.endpoint.clone(),
                    api_key_configured: !s.api_key.trim().is_empty(),
                    engine_id_configured: !s.engine_id.trim().is_empty(),
                    region: s.region.clone(),
                    language: s.language.clone(),
                    timeout_secs: s.timeout_secs,
                    max_results: s.max_results,
                }),
            quota: config.quota.clone(),
            images: config.images.clone(),
            sessions: config.sessions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path.to_str().unwrap(), "gondola.db");
        assert_eq!(config.catalog.branches, vec![1, 2, 3]);
        assert_eq!(config.catalog.active_within_days, Some(300));
        assert_eq!(config.quota.max_calls, 100);
        assert_eq!(config.quota.window_secs, 3600);
        assert_eq!(config.images.download_timeout_secs, 15);
        assert_eq!(config.sessions.idle_timeout_secs, 14400);
        assert_eq!(config.sessions.sweep_interval_secs, 300);
        assert!(config.image_search.is_none());
    }

    #[test]
    fn test_deserialize_image_search_defaults() {
        let toml = r#"
[image_search]
api_key = "key"
engine_id = "cx"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let search = config.image_search.unwrap();
        assert_eq!(search.endpoint, "https://www.googleapis.com/customsearch/v1");
        assert_eq!(search.region, "br");
        assert_eq!(search.language, "pt");
        assert_eq!(search.file_types, "jpg,png,jpeg");
        assert!(search.safe_search);
        assert_eq!(search.timeout_secs, 10);
        assert_eq!(search.max_results, 4);
        assert_eq!(search.description_qualifier, "embalagem");
        assert!(search.has_credentials());
    }

    #[test]
    fn test_image_search_without_engine_id_parses_without_credentials() {
        let toml = r#"
[image_search]
api_key = "key"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let search = config.image_search.unwrap();
        assert_eq!(search.engine_id, "");
        assert!(!search.has_credentials());
    }

    #[test]
    fn test_blank_credentials_are_not_credentials() {
        let toml = r#"
[image_search]
api_key = "  "
engine_id = "cx"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(!config.image_search.unwrap().has_credentials());
    }

    #[test]
    fn test_deserialize_custom_sections() {
        let toml = r#"
[database]
path = "/data/catalog.sqlite"
native_client_path = "/opt/client"

[catalog]
branches = []
active_within_days = 30

[images]
dir = "/srv/photos"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.database.path.to_str().unwrap(),
            "/data/catalog.sqlite"
        );
        assert_eq!(
            config.database.native_client_path,
            Some(PathBuf::from("/opt/client"))
        );
        assert!(config.catalog.branches.is_empty());
        assert_eq!(config.catalog.active_within_days, Some(30));
        assert_eq!(config.images.dir, PathBuf::from("/srv/photos"));
    }

    #[test]
    fn test_sanitized_config_hides_credentials() {
        let toml = r#"
[image_search]
api_key = "secret-key"
engine_id = "secret-cx"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        let search = sanitized.image_search.as_ref().unwrap();
        assert!(search.api_key_configured);
        assert!(search.engine_id_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-key"));
        assert!(!json.contains("secret-cx"));
    }

    #[test]
    fn test_sanitized_config_without_search() {
        let sanitized = SanitizedConfig::from(&Config::default());
        assert!(sanitized.image_search.is_none());
        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("image_search"));
    }
}
