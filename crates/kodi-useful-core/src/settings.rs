//! The persisted-settings collaborator.
//!
//! Settings-scoped route parameters are read through [`SettingsStore`]. The
//! host normally owns the real store; [`MemorySettings`] is a string-backed
//! implementation used by the runtime (seeded from configuration) and tests.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

use crate::cast::TypeCast;
use crate::error::SettingsError;

/// Typed getter requested from a settings store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKind {
    /// Boolean setting.
    Bool,
    /// Integer setting.
    Int,
    /// Floating point setting.
    Float,
    /// Free-form string setting.
    Str,
}

impl SettingKind {
    fn type_cast(self) -> TypeCast {
        match self {
            Self::Bool => TypeCast::boolean(),
            Self::Int => TypeCast::integer(),
            Self::Float => TypeCast::float(),
            Self::Str => TypeCast::string(),
        }
    }
}

/// Key/typed-getter access to persisted add-on settings.
pub trait SettingsStore: Send + Sync {
    /// Reads `key` and converts it to `kind`.
    fn get_setting(&self, key: &str, kind: SettingKind) -> Result<Value, SettingsError>;
}

/// In-memory settings stored as raw strings, converted on read.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySettings {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value (builder pattern).
    pub fn with(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Stores a raw value, replacing any previous one.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), value.into());
    }

    /// Removes a value.
    pub fn remove(&self, key: &str) -> Option<String> {
        self.values.write().remove(key)
    }

    /// Returns the raw stored string.
    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }
}

impl<K, V> FromIterator<(K, V)> for MemorySettings
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let values = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: RwLock::new(values),
        }
    }
}

impl SettingsStore for MemorySettings {
    fn get_setting(&self, key: &str, kind: SettingKind) -> Result<Value, SettingsError> {
        let values = self.values.read();
        let raw = values.get(key).ok_or_else(|| SettingsError::NotFound {
            key: key.to_owned(),
        })?;
        kind.type_cast()
            .cast(raw)
            .map_err(|source| SettingsError::Cast {
                key: key.to_owned(),
                source,
            })
    }
}
