//! Unit-of-work lifecycle.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::OperationError;

/// The transactional boundary around one piece of business work.
///
/// An operation is begun, then either completed (its effects become
/// permanent) or cancelled (its effects are rolled back).
#[async_trait]
pub trait Operation: Send + Sync {
    /// Starts the unit of work.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit of work cannot be started.
    async fn begin(&mut self, cancellation: &CancellationToken) -> Result<(), OperationError>;

    /// Makes the unit of work's effects permanent.
    ///
    /// # Errors
    ///
    /// A failed completion leaves the unit of work uncommitted.
    async fn complete(&mut self, cancellation: &CancellationToken) -> Result<(), OperationError>;

    /// Abandons the unit of work.
    ///
    /// # Errors
    ///
    /// Returns an error if rolling back fails.
    async fn cancel(&mut self, cancellation: &CancellationToken) -> Result<(), OperationError>;
}
