//! Operation decorator that raises domain events on completion.

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::error::OperationError;
use herald_core::operation::Operation;
use herald_core::publisher::DomainEventAggregator;
use tokio_util::sync::CancellationToken;

/// Wraps an [`Operation`] so that completing it first drains the aggregator
/// of the unit of work.
///
/// Handlers therefore run inside the unit of work, before its effects become
/// permanent. If the drain fails the inner operation is not completed and the
/// drain error is returned; the caller is expected to cancel.
pub struct RaiseDomainEventsOperation<O> {
    aggregator: Arc<dyn DomainEventAggregator>,
    inner: O,
}

impl<O: Operation> RaiseDomainEventsOperation<O> {
    /// Decorates `inner` with the aggregator of the same unit of work.
    #[must_use]
    pub fn new(aggregator: Arc<dyn DomainEventAggregator>, inner: O) -> Self {
        Self { aggregator, inner }
    }

    /// The decorated operation.
    #[must_use]
    pub fn inner(&self) -> &O {
        &self.inner
    }

    /// Unwraps the decorated operation.
    #[must_use]
    pub fn into_inner(self) -> O {
        self.inner
    }
}

#[async_trait]
impl<O: Operation> Operation for RaiseDomainEventsOperation<O> {
    async fn begin(&mut self, cancellation: &CancellationToken) -> Result<(), OperationError> {
        self.inner.begin(cancellation).await
    }

    async fn complete(&mut self, cancellation: &CancellationToken) -> Result<(), OperationError> {
        self.aggregator.raise_events(cancellation).await?;
        self.inner.complete(cancellation).await
    }

    async fn cancel(&mut self, cancellation: &CancellationToken) -> Result<(), OperationError> {
        self.inner.cancel(cancellation).await
    }
}
