//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use kodi_useful_router::{DEFAULT_CARRY_PARAM, DEFAULT_ROUTE_KEY};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AddonConfig {
    /// Identity of the add-on.
    #[serde(default)]
    pub addon: AddonSection,

    /// Route key and carried parameter.
    #[serde(default)]
    pub router: RouterConfig,

    /// Logging setup.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Initial values of the add-on settings, by setting id.
    #[serde(default)]
    pub settings: BTreeMap<String, Value>,
}

impl AddonConfig {
    /// Returns the settings as the raw strings a settings store holds.
    ///
    /// Strings are kept verbatim, other values use their JSON spelling.
    pub fn settings_strings(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.settings.iter().map(|(key, value)| {
            let raw = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key.clone(), raw)
        })
    }
}

/// Add-on identity.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AddonSection {
    /// Add-on id, e.g. `plugin.video.vk`.
    #[serde(default)]
    pub id: String,

    /// Base of generated URLs; derived from the id when absent.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl AddonSection {
    /// Returns the explicit base URL, or `plugin://<id>/`.
    pub fn resolved_base_url(&self) -> Option<String> {
        match &self.base_url {
            Some(base) => Some(base.clone()),
            None if !self.id.is_empty() => Some(format!("plugin://{}/", self.id)),
            None => None,
        }
    }
}

/// Router settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Query key carrying the route name.
    #[serde(default = "default_route_param")]
    pub route_param: String,

    /// Query key carried into generated links; empty disables carrying.
    #[serde(default = "default_carry_param")]
    pub carry_param: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            route_param: default_route_param(),
            carry_param: default_carry_param(),
        }
    }
}

impl RouterConfig {
    /// Returns the carried parameter, `None` when disabled.
    pub fn carry_param(&self) -> Option<&str> {
        Some(self.carry_param.as_str()).filter(|p| !p.is_empty())
    }
}

fn default_route_param() -> String {
    DEFAULT_ROUTE_KEY.to_string()
}

fn default_carry_param() -> String {
    DEFAULT_CARRY_PARAM.to_string()
}

// =============================================================================
// Logging
// =============================================================================

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the level as a filter directive string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `Full` otherwise.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Global log level.
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file, for `output = "file"`. Defaults to
    /// `<userdata>/addon_data/<id>/<id>.log`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include file names and line numbers.
    #[serde(default)]
    pub file_location: bool,

    /// Per-module levels, e.g. `kodi_useful_router = "debug"`.
    #[serde(default)]
    pub filters: BTreeMap<String, LogLevel>,
}
