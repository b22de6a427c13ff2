//! Resolution of live handler instances for an event type.

use std::fmt;
use std::sync::Arc;

use herald_core::error::DispatchError;
use herald_core::event::{DomainEvent, EventType};
use herald_core::handler::DomainEventHandler;

use crate::catalog::{BoundInvocation, HandlerCatalog};
use crate::provider::{HandlerInstance, ServiceProvider};

/// Combines the boot-time [`HandlerCatalog`] with the [`ServiceProvider`] of
/// one unit of work.
#[derive(Clone)]
pub struct HandlerResolver {
    catalog: Arc<HandlerCatalog>,
    provider: Arc<dyn ServiceProvider>,
}

impl HandlerResolver {
    /// Creates a resolver for one unit of work.
    #[must_use]
    pub fn new(catalog: Arc<HandlerCatalog>, provider: Arc<dyn ServiceProvider>) -> Self {
        Self { catalog, provider }
    }

    /// The catalog this resolver reads from.
    #[must_use]
    pub fn catalog(&self) -> &HandlerCatalog {
        &self.catalog
    }

    /// Returns the live handlers for `event_type`, ordered by catalog
    /// registration and, within one handler type, by provider order.
    #[must_use]
    pub fn resolve_instances(&self, event_type: EventType) -> Vec<HandlerInstance> {
        self.catalog
            .lookup(event_type)
            .iter()
            .flat_map(|&handler_type| self.provider.get_all(handler_type, event_type))
            .collect()
    }

    /// Binds `instance`'s entry point for the concrete type of `event`.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::HandlerBinding` if the instance has no entry
    /// point for the event type.
    pub fn bind_invocable(
        &self,
        instance: &HandlerInstance,
        event: &Arc<dyn DomainEvent>,
    ) -> Result<BoundInvocation, DispatchError> {
        self.catalog.bind(instance, event)
    }

    /// Returns the live handlers of a statically known event type as typed
    /// trait objects.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::HandlerBinding` if the provider returned an
    /// instance that does not handle `E`.
    pub fn handlers_for<E: DomainEvent>(
        &self,
    ) -> Result<Vec<Arc<dyn DomainEventHandler<E>>>, DispatchError> {
        self.resolve_instances(EventType::of::<E>())
            .iter()
            .map(|instance| self.catalog.typed_handler::<E>(instance))
            .collect()
    }
}

impl fmt::Debug for HandlerResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerResolver")
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}
