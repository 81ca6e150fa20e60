//! # kodi-useful core
//!
//! Leaf building blocks of the kodi-useful routing engine:
//!
//! - **Query codec**: [`QueryParams`] parses the query portion of a plugin URL
//!   into an ordered multi-map and reads typed values out of it
//! - **Coercion**: [`TypeCast`] and the built-in bool/int/float/string/JSON casts
//! - **Settings collaborator**: the [`SettingsStore`] interface and the
//!   string-backed [`MemorySettings`]
//! - **Errors**: [`ErrorKind`], [`HandlerError`] and the per-concern error enums
//!
//! Routing, binding and URL generation live in `kodi-useful-router`.

pub mod cast;
pub mod error;
pub mod query;
pub mod settings;
pub mod value;

pub use cast::{TypeCast, parse_bool, parse_json};
pub use error::{
    CastError, ErrorClass, ErrorKind, HandlerError, HandlerResult, QueryError, SettingsError,
    WithKind,
};
pub use query::QueryParams;
pub use settings::{MemorySettings, SettingKind, SettingsStore};
pub use value::{QueryValue, Value, query_strings};
