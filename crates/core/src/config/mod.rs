//! Configuration: endpoint addresses, upload transport, retry budget.

mod loader;
mod types;
mod validate;

pub use loader::{load_config, load_config_from_str};
pub use types::{Config, ConfigError, EndpointsConfig, UploadConfig};
pub use validate::validate_config;
