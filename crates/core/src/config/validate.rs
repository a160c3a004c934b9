use super::{types::Config, ConfigError};

/// Validate configuration.
///
/// Hard failures are returned as `ConfigError::ValidationError`. Conditions
/// that only disable a feature are returned as warnings for the caller to log.
pub fn validate_config(config: &Config) -> Result<Vec<String>, ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.quota.max_calls == 0 {
        return Err(ConfigError::ValidationError(
            "quota.max_calls cannot be 0".to_string(),
        ));
    }

    if config.quota.window_secs == 0 {
        return Err(ConfigError::ValidationError(
            "quota.window_secs cannot be 0".to_string(),
        ));
    }

    if config.images.download_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "images.download_timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.sessions.idle_timeout_secs == 0 || config.sessions.sweep_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "sessions.idle_timeout_secs and sessions.sweep_interval_secs cannot be 0".to_string(),
        ));
    }

    let mut warnings = Vec::new();

    match &config.image_search {
        Some(search) => {
            if search.timeout_secs == 0 {
                return Err(ConfigError::ValidationError(
                    "image_search.timeout_secs cannot be 0".to_string(),
                ));
            }
            // The provider caps `num` at 10
            if !(1..=10).contains(&search.max_results) {
                return Err(ConfigError::ValidationError(format!(
                    "image_search.max_results must be between 1 and 10, got {}",
                    search.max_results
                )));
            }
            if !search.has_credentials() {
                warnings.push(
                    "image_search credentials are incomplete; image search is disabled"
                        .to_string(),
                );
            }
        }
        None => {
            warnings.push("image_search is not configured; image search is disabled".to_string());
        }
    }

    if let Some(path) = &config.database.native_client_path {
        if !path.exists() {
            warnings.push(format!(
                "database.native_client_path not found: {}",
                path.display()
            ));
        }
    }

    Ok(warnings)
}
