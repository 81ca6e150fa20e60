//! kodi-useful runtime - configuration, logging and invocation handling.
//!
//! This crate provides:
//! - Layered configuration (`ConfigLoader`, `AddonConfig`)
//! - Logging setup on top of `tracing-subscriber` (`LoggingBuilder`)
//! - Parsing of Kodi plugin arguments (`Invocation`)
//! - The add-on runtime tying a dispatcher to its context (`AddonRuntime`)
//!
//! ```ignore
//! use kodi_useful_runtime::{Invocation, RuntimeBuilder};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = RuntimeBuilder::new()
//!         .config_file("resources/kodi-useful.toml")
//!         .build(dispatcher(), Addon::new())?;
//!
//!     runtime.run(&Invocation::from_env()?)?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod invocation;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{AddonConfig, ConfigError, ConfigLoader, ConfigResult, LoggingConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use invocation::Invocation;
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{AddonRuntime, RuntimeBuilder};

// Re-export tracing for use by add-ons
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides the commonly used logging macros and `Level` for spans.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
