//! Runtime error types.

use kodi_useful_router::DispatchError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while starting or running an add-on.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The process arguments do not describe a plugin invocation.
    #[error("Invalid invocation: {0}")]
    InvalidInvocation(String),

    /// The plugin handle is not an integer.
    #[error("Invalid plugin handle: {0:?}")]
    InvalidHandle(String),

    /// A handler failed and no error handler dealt with it.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
