//! Use cases of the ordering context.
//!
//! Every use case is one unit of work: a [`StoreTransaction`] wrapped so that
//! completing it raises the events the order recorded.

use std::sync::Arc;

use herald_core::CancellationToken;
use herald_core::clock::Clock;
use herald_core::error::{DomainError, OperationError};
use herald_core::publisher::DomainEventPublisher;
use herald_dispatch::DomainEvents;
use uuid::Uuid;

use super::store::{InMemoryStore, StoreTransaction};
use crate::domain::order::Order;

/// Entry point for ordering use cases.
#[derive(Clone)]
pub struct OrderService {
    domain_events: DomainEvents,
    store: Arc<InMemoryStore>,
    clock: Arc<dyn Clock>,
}

impl OrderService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        domain_events: DomainEvents,
        store: Arc<InMemoryStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            domain_events,
            store,
            clock,
        }
    }

    /// The store the service writes to.
    #[must_use]
    pub fn store(&self) -> &Arc<InMemoryStore> {
        &self.store
    }

    /// Places an order and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::Domain` for invalid input and
    /// `OperationError::Dispatch` if a handler rejected the order. Nothing is
    /// stored in either case.
    pub async fn place_order(
        &self,
        customer: &str,
        quantity: u32,
        unit_price_cents: u64,
        cancellation: &CancellationToken,
    ) -> Result<Uuid, OperationError> {
        let store = Arc::clone(&self.store);
        let clock = Arc::clone(&self.clock);
        let customer = customer.to_owned();
        self.domain_events
            .begin_scope()
            .run(self.transaction(), cancellation, move |publisher| async move {
                let total_cents = u64::from(quantity)
                    .checked_mul(unit_price_cents)
                    .ok_or_else(|| DomainError::Validation("order total overflows".into()))?;
                let order = Order::place(
                    Uuid::now_v7(),
                    &customer,
                    quantity,
                    total_cents,
                    clock.as_ref(),
                )?;
                let order_id = order.id;
                persist(&store, publisher.as_ref(), order)?;
                tracing::info!(order_id = %order_id, "order placed");
                Ok::<_, OperationError>(order_id)
            })
            .await
    }

    /// Captures payment for an order.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::Domain` if the order does not exist or does not
    /// accept the payment, and `OperationError::Dispatch` if a handler failed.
    pub async fn pay_order(
        &self,
        order_id: Uuid,
        amount_cents: u64,
        cancellation: &CancellationToken,
    ) -> Result<(), OperationError> {
        let clock = Arc::clone(&self.clock);
        self.change_order(order_id, cancellation, move |order| {
            order.capture_payment(amount_cents, clock.as_ref())
        })
        .await
    }

    /// Ships a paid order.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::Domain` if the order does not exist or is not
    /// paid, and `OperationError::Dispatch` if a handler failed.
    pub async fn ship_order(
        &self,
        order_id: Uuid,
        carrier: &str,
        cancellation: &CancellationToken,
    ) -> Result<(), OperationError> {
        let clock = Arc::clone(&self.clock);
        let carrier = carrier.to_owned();
        self.change_order(order_id, cancellation, move |order| {
            order.ship(&carrier, clock.as_ref())
        })
        .await
    }

    fn transaction(&self) -> StoreTransaction {
        StoreTransaction::new(Arc::clone(&self.store))
    }

    async fn change_order<F>(
        &self,
        order_id: Uuid,
        cancellation: &CancellationToken,
        change: F,
    ) -> Result<(), OperationError>
    where
        F: FnOnce(&mut Order) -> Result<(), DomainError>,
    {
        let store = Arc::clone(&self.store);
        self.domain_events
            .begin_scope()
            .run(self.transaction(), cancellation, move |publisher| async move {
                let mut order = store.load_order(order_id)?;
                change(&mut order)?;
                persist(&store, publisher.as_ref(), order)?;
                Ok::<_, OperationError>(())
            })
            .await
    }
}

/// Publishes the events the order recorded, then stages the order without
/// them so they are never published twice.
fn persist(
    store: &InMemoryStore,
    publisher: &dyn DomainEventPublisher,
    mut order: Order,
) -> Result<(), OperationError> {
    let queued = publisher.publish_domain_events(&order)?;
    tracing::debug!(order_id = %order.id, queued, "order events published");
    order.clear_events();
    store.save_order(order)?;
    Ok(())
}
