//! Boot-time wiring and per-unit-of-work scopes.
//!
//! [`DomainEvents`] is built once when the application starts. It owns the
//! handler catalog, the handler factories and the dispatch configuration.
//! Every unit of work then calls [`DomainEvents::begin_scope`] to obtain an
//! [`EventScope`] holding its own aggregator and its own handler instances.

use std::future::Future;
use std::sync::Arc;

use herald_core::error::{DispatchError, OperationError};
use herald_core::event::DomainEvent;
use herald_core::operation::Operation;
use herald_core::publisher::{DomainEventAggregator, DomainEventPublisher};
use tokio_util::sync::CancellationToken;

use crate::aggregator::EventAggregator;
use crate::catalog::{HandlerCatalog, HandlerCatalogBuilder, HandlerComponent};
use crate::config::DispatchConfig;
use crate::decorator::RaiseDomainEventsOperation;
use crate::provider::{HandlerFactories, ScopedServiceProvider};
use crate::resolver::HandlerResolver;

/// The dispatcher as configured at startup.
#[derive(Debug, Clone)]
pub struct DomainEvents {
    catalog: Arc<HandlerCatalog>,
    factories: Arc<HandlerFactories>,
    config: DispatchConfig,
}

impl DomainEvents {
    /// Starts registering handlers.
    #[must_use]
    pub fn builder() -> DomainEventsBuilder {
        DomainEventsBuilder::default()
    }

    /// Assembles the dispatcher from parts built elsewhere.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::MissingHandlerFactory` if a catalogued handler
    /// type has no factory.
    pub fn new(
        catalog: HandlerCatalog,
        factories: HandlerFactories,
        config: DispatchConfig,
    ) -> Result<Self, DispatchError> {
        catalog.validate(&factories)?;
        tracing::info!(
            handler_types = catalog.handler_types().len(),
            drain_policy = %config.drain_policy,
            "domain events initialized"
        );
        Ok(Self {
            catalog: Arc::new(catalog),
            factories: Arc::new(factories),
            config,
        })
    }

    /// The handler catalog.
    #[must_use]
    pub fn catalog(&self) -> &HandlerCatalog {
        &self.catalog
    }

    /// The dispatch configuration.
    #[must_use]
    pub fn config(&self) -> DispatchConfig {
        self.config
    }

    /// Opens a scope for one unit of work, with a fresh aggregator and fresh
    /// handler instances.
    #[must_use]
    pub fn begin_scope(&self) -> EventScope {
        let provider = ScopedServiceProvider::new(Arc::clone(&self.factories));
        let resolver = HandlerResolver::new(Arc::clone(&self.catalog), Arc::new(provider));
        EventScope {
            aggregator: Arc::new(EventAggregator::new(resolver, self.config)),
        }
    }
}

/// Registers handler types together with the factories that build them.
#[derive(Default)]
pub struct DomainEventsBuilder {
    catalog: HandlerCatalogBuilder,
    factories: HandlerFactories,
    config: DispatchConfig,
}

impl DomainEventsBuilder {
    /// Registers handler type `H` and a factory producing its instances.
    ///
    /// Registering the same handler type again adds another factory: each one
    /// contributes its own instance, and all of them receive events.
    #[must_use]
    pub fn handler<H, F>(mut self, factory: F) -> Self
    where
        H: HandlerComponent,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.catalog = self.catalog.register::<H>();
        self.factories.register(factory);
        self
    }

    /// Declares an event type the application publishes. See
    /// [`HandlerCatalogBuilder::known_event`].
    #[must_use]
    pub fn known_event<E: DomainEvent>(mut self) -> Self {
        self.catalog = self.catalog.known_event::<E>();
        self
    }

    /// Replaces the default configuration.
    #[must_use]
    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the catalog and validates it against the factories.
    ///
    /// # Errors
    ///
    /// See [`DomainEvents::new`].
    pub fn build(self) -> Result<DomainEvents, DispatchError> {
        DomainEvents::new(self.catalog.build(), self.factories, self.config)
    }
}

/// The dispatcher state of one unit of work.
#[derive(Debug, Clone)]
pub struct EventScope {
    aggregator: Arc<EventAggregator>,
}

impl EventScope {
    /// The publisher domain code in this unit of work should use.
    #[must_use]
    pub fn publisher(&self) -> Arc<dyn DomainEventPublisher> {
        Arc::clone(&self.aggregator) as Arc<dyn DomainEventPublisher>
    }

    /// The aggregator of this unit of work.
    #[must_use]
    pub fn aggregator(&self) -> &Arc<EventAggregator> {
        &self.aggregator
    }

    /// The resolver of this unit of work, for typed handler lookups.
    #[must_use]
    pub fn resolver(&self) -> &HandlerResolver {
        self.aggregator.resolver()
    }

    /// Wraps `operation` so that completing it raises this scope's events.
    #[must_use]
    pub fn decorate<O: Operation>(&self, operation: O) -> RaiseDomainEventsOperation<O> {
        let aggregator = Arc::clone(&self.aggregator) as Arc<dyn DomainEventAggregator>;
        RaiseDomainEventsOperation::new(aggregator, operation)
    }

    /// Runs `work` as one unit of work around `operation`.
    ///
    /// The operation is begun, `work` runs with this scope's publisher, and the
    /// operation is completed, which raises every event published meanwhile.
    /// If `work` or the completion fails, the operation is cancelled and the
    /// original error is returned.
    ///
    /// # Errors
    ///
    /// Returns the first error of `begin`, `work` or `complete`. A failing
    /// `cancel` is logged and does not replace the original error.
    pub async fn run<O, F, Fut, T>(
        &self,
        operation: O,
        cancellation: &CancellationToken,
        work: F,
    ) -> Result<T, OperationError>
    where
        O: Operation,
        F: FnOnce(Arc<dyn DomainEventPublisher>) -> Fut,
        Fut: Future<Output = Result<T, OperationError>>,
    {
        let mut operation = self.decorate(operation);
        operation.begin(cancellation).await?;

        let outcome = match work(self.publisher()).await {
            Ok(value) => operation.complete(cancellation).await.map(|()| value),
            Err(error) => Err(error),
        };

        if let Err(error) = &outcome {
            tracing::debug!(error = %error, "unit of work failed; cancelling operation");
            if let Err(cancel_error) = operation.cancel(cancellation).await {
                tracing::warn!(error = %cancel_error, "cancelling the operation failed");
            }
        }
        outcome
    }
}
