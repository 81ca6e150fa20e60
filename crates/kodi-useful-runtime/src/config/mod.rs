//! Configuration of a kodi-useful add-on.
//!
//! Sources are layered with figment: built-in defaults, optional config
//! files (TOML by default, YAML behind `yaml-config`) and `KODI_USEFUL_*`
//! environment variables.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, ENV_PREFIX, Profile, load_config, load_config_from_file};
pub use schema::{
    AddonConfig, AddonSection, LogFormat, LogLevel, LogOutput, LoggingConfig, RouterConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
