//! Herald Dispatch — deferred domain event aggregation and dispatch.
//!
//! Domain code publishes events into an [`EventAggregator`] scoped to one unit
//! of work. Publishing resolves every handler registered for the event's
//! concrete type and queues one bound invocation per handler. Nothing runs
//! until the unit of work completes: [`RaiseDomainEventsOperation`] drains the
//! queue in publish order before delegating to the inner completion step, so a
//! failing handler aborts the whole unit of work.
//!
//! The [`HandlerCatalog`] is built once at startup from handler types that
//! declare their capabilities through [`HandlerComponent`]. [`DomainEvents`]
//! ties the catalog, the handler factories and the configuration together and
//! opens one [`EventScope`] per unit of work.

pub mod aggregator;
pub mod catalog;
pub mod config;
pub mod decorator;
pub mod provider;
pub mod queue;
pub mod resolver;
pub mod runtime;

pub use aggregator::EventAggregator;
pub use catalog::{
    BoundInvocation, Capabilities, HandlerCatalog, HandlerCatalogBuilder, HandlerComponent,
};
pub use config::{ConfigError, DispatchConfig, DrainPolicy};
pub use decorator::RaiseDomainEventsOperation;
pub use provider::{HandlerFactories, HandlerInstance, ScopedServiceProvider, ServiceProvider};
pub use queue::{PendingAction, PendingActionQueue};
pub use resolver::HandlerResolver;
pub use runtime::{DomainEvents, DomainEventsBuilder, EventScope};
