use super::{Config, ConfigError};

/// Validate semantic constraints that serde defaults cannot express.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let base = &config.endpoints.base_url;
    if !base.starts_with("http://") && !base.starts_with("https://") {
        return Err(ConfigError::Invalid(format!(
            "endpoints.base_url must start with http:// or https://, got {base}"
        )));
    }

    if config.endpoints.status_port == 0 {
        return Err(ConfigError::Invalid(
            "endpoints.status_port must be non-zero".to_string(),
        ));
    }

    if config.endpoints.streaming_port == 0 {
        return Err(ConfigError::Invalid(
            "endpoints.streaming_port must be non-zero".to_string(),
        ));
    }

    if config.retry.budget_ticks == 0 {
        return Err(ConfigError::Invalid(
            "retry.budget_ticks must be at least 1".to_string(),
        ));
    }

    if config.retry.tick_secs == 0 {
        return Err(ConfigError::Invalid(
            "retry.tick_secs must be at least 1".to_string(),
        ));
    }

    Ok(())
}
