use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::validate::validate_config;
use super::{types::Config, ConfigError};

/// Load configuration from a TOML file, apply environment overrides, and
/// validate the result. Callers never see a config that fails validation.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let figment = Figment::from(Toml::file(path)).merge(Env::prefixed("UPLIFT_").split("_"));
    finish(figment.extract().map_err(|e| ConfigError::ParseError(e.to_string()))?)
}

/// Load and validate configuration from a TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    finish(toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))?)
}

fn finish(config: Config) -> Result<Config, ConfigError> {
    validate_config(&config)?;
    Ok(config)
}
