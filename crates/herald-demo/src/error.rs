//! Herald demo — application error types.

use herald_core::error::{DispatchError, OperationError};
use herald_dispatch::ConfigError;
use thiserror::Error;

/// Startup and runtime errors for the demo binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// An environment variable is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The handler catalog failed validation.
    #[error("dispatcher setup failed: {0}")]
    Dispatch(#[from] DispatchError),

    /// A unit of work failed.
    #[error("operation failed: {0}")]
    Operation(#[from] OperationError),
}
