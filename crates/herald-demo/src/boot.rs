//! Startup wiring for the ordering context.

use std::sync::Arc;

use herald_core::clock::Clock;
use herald_core::error::DispatchError;
use herald_dispatch::{DispatchConfig, DomainEvents};

use crate::application::handlers::{AuditTrail, CustomerNotifier, InventoryReservation};
use crate::application::service::OrderService;
use crate::application::store::InMemoryStore;
use crate::domain::events::{OrderPlaced, OrderShipped, PaymentCaptured};

/// Registers the ordering handlers. For an `OrderPlaced` event they run in
/// this order: stock reservation, customer notification, audit trail.
///
/// # Errors
///
/// Returns `DispatchError` if the handler catalog fails validation.
pub fn domain_events(
    store: &Arc<InMemoryStore>,
    clock: &Arc<dyn Clock>,
    config: DispatchConfig,
) -> Result<DomainEvents, DispatchError> {
    let reservation_store = Arc::clone(store);
    let notifier_store = Arc::clone(store);
    let audit_store = Arc::clone(store);
    let audit_clock = Arc::clone(clock);

    DomainEvents::builder()
        .config(config)
        .handler(move || InventoryReservation::new(Arc::clone(&reservation_store)))
        .handler(move || CustomerNotifier::new(Arc::clone(&notifier_store)))
        .handler(move || AuditTrail::new(Arc::clone(&audit_store), Arc::clone(&audit_clock)))
        .known_event::<OrderPlaced>()
        .known_event::<PaymentCaptured>()
        .known_event::<OrderShipped>()
        .build()
}

/// Builds an [`OrderService`] over `store`.
///
/// # Errors
///
/// See [`domain_events`].
pub fn order_service(
    store: Arc<InMemoryStore>,
    clock: Arc<dyn Clock>,
    config: DispatchConfig,
) -> Result<OrderService, DispatchError> {
    let domain_events = domain_events(&store, &clock, config)?;
    Ok(OrderService::new(domain_events, store, clock))
}
