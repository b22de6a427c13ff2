//! Test operation — records lifecycle calls instead of touching storage.

use async_trait::async_trait;
use herald_core::error::{DomainError, OperationError};
use herald_core::operation::Operation;
use tokio_util::sync::CancellationToken;

use crate::log::InvocationLog;

/// An [`Operation`] that records `"begin"`, `"complete"` and `"cancel"` calls.
///
/// A failing completion is not recorded, so the log shows only the steps that
/// took effect.
#[derive(Debug, Default)]
pub struct RecordingOperation {
    calls: InvocationLog,
    fail_on_complete: bool,
}

impl RecordingOperation {
    /// An operation whose steps all succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An operation whose `complete` fails with an infrastructure error.
    #[must_use]
    pub fn failing_on_complete() -> Self {
        Self {
            fail_on_complete: true,
            ..Self::default()
        }
    }

    /// A handle to the recorded calls that outlives the operation.
    #[must_use]
    pub fn calls(&self) -> InvocationLog {
        self.calls.clone()
    }
}

#[async_trait]
impl Operation for RecordingOperation {
    async fn begin(&mut self, _cancellation: &CancellationToken) -> Result<(), OperationError> {
        self.calls.push("begin");
        Ok(())
    }

    async fn complete(&mut self, _cancellation: &CancellationToken) -> Result<(), OperationError> {
        if self.fail_on_complete {
            return Err(DomainError::Infrastructure("commit refused".into()).into());
        }
        self.calls.push("complete");
        Ok(())
    }

    async fn cancel(&mut self, _cancellation: &CancellationToken) -> Result<(), OperationError> {
        self.calls.push("cancel");
        Ok(())
    }
}
