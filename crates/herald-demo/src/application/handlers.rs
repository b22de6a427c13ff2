//! Domain event handlers for the ordering context.
//!
//! Each handler writes through the [`InMemoryStore`] of the unit of work that
//! published the event, so its effects commit or roll back together with the
//! business change.

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::CancellationToken;
use herald_core::clock::Clock;
use herald_core::error::DomainError;
use herald_core::handler::DomainEventHandler;
use herald_dispatch::{Capabilities, HandlerComponent};
use serde::Serialize;
use uuid::Uuid;

use super::store::{InMemoryStore, Notification};
use crate::domain::events::{OrderPlaced, OrderShipped, PaymentCaptured};

/// Reserves stock for placed orders. Fails when stock runs out.
#[derive(Debug)]
pub struct InventoryReservation {
    store: Arc<InMemoryStore>,
}

impl InventoryReservation {
    /// Creates the handler.
    #[must_use]
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DomainEventHandler<OrderPlaced> for InventoryReservation {
    async fn handle(
        &self,
        event: &OrderPlaced,
        cancellation: &CancellationToken,
    ) -> Result<(), DomainError> {
        if cancellation.is_cancelled() {
            return Err(DomainError::Cancelled);
        }
        self.store.write(|state| {
            if state.stock < event.quantity {
                return Err(DomainError::Validation(format!(
                    "insufficient stock for order {}: {} requested, {} available",
                    event.order_id, event.quantity, state.stock
                )));
            }
            state.stock -= event.quantity;
            state.reservations.push((event.order_id, event.quantity));
            Ok(())
        })?;
        tracing::info!(order_id = %event.order_id, quantity = event.quantity, "stock reserved");
        Ok(())
    }
}

impl HandlerComponent for InventoryReservation {
    fn capabilities(caps: &mut Capabilities<Self>) {
        caps.handles::<OrderPlaced>();
    }
}

/// Tells customers about their orders.
#[derive(Debug)]
pub struct CustomerNotifier {
    store: Arc<InMemoryStore>,
}

impl CustomerNotifier {
    /// Creates the handler.
    #[must_use]
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self { store }
    }

    fn notify(&self, customer: String, message: String) -> Result<(), DomainError> {
        self.store.write(|state| {
            state.notifications.push(Notification { customer, message });
            Ok(())
        })
    }
}

#[async_trait]
impl DomainEventHandler<OrderPlaced> for CustomerNotifier {
    async fn handle(&self, event: &OrderPlaced, _: &CancellationToken) -> Result<(), DomainError> {
        self.notify(
            event.customer.clone(),
            format!("order {} received", event.order_id),
        )
    }
}

#[async_trait]
impl DomainEventHandler<OrderShipped> for CustomerNotifier {
    async fn handle(&self, event: &OrderShipped, _: &CancellationToken) -> Result<(), DomainError> {
        let customer = self.store.load_order(event.order_id)?.customer().to_owned();
        self.notify(
            customer,
            format!("order {} shipped with {}", event.order_id, event.carrier),
        )
    }
}

impl HandlerComponent for CustomerNotifier {
    fn capabilities(caps: &mut Capabilities<Self>) {
        caps.handles::<OrderPlaced>().handles::<OrderShipped>();
    }
}

/// Appends every ordering event to the audit trail as JSON.
pub struct AuditTrail {
    store: Arc<InMemoryStore>,
    clock: Arc<dyn Clock>,
}

impl AuditTrail {
    /// Creates the handler. Entries are stamped with `clock`.
    #[must_use]
    pub fn new(store: Arc<InMemoryStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn append<E: Serialize>(
        &self,
        kind: &str,
        order_id: Uuid,
        event: &E,
    ) -> Result<(), DomainError> {
        let payload = serde_json::to_value(event).map_err(|e| {
            DomainError::Infrastructure(format!("event serialization failed: {e}"))
        })?;
        let entry = serde_json::json!({
            "kind": kind,
            "order_id": order_id,
            "recorded_at": self.clock.now(),
            "payload": payload,
        });
        self.store.write(|state| {
            state.audit.push(entry);
            Ok(())
        })
    }
}

#[async_trait]
impl DomainEventHandler<OrderPlaced> for AuditTrail {
    async fn handle(&self, event: &OrderPlaced, _: &CancellationToken) -> Result<(), DomainError> {
        self.append("order_placed", event.order_id, event)
    }
}

#[async_trait]
impl DomainEventHandler<PaymentCaptured> for AuditTrail {
    async fn handle(
        &self,
        event: &PaymentCaptured,
        _: &CancellationToken,
    ) -> Result<(), DomainError> {
        self.append("payment_captured", event.order_id, event)
    }
}

#[async_trait]
impl DomainEventHandler<OrderShipped> for AuditTrail {
    async fn handle(&self, event: &OrderShipped, _: &CancellationToken) -> Result<(), DomainError> {
        self.append("order_shipped", event.order_id, event)
    }
}

impl HandlerComponent for AuditTrail {
    fn capabilities(caps: &mut Capabilities<Self>) {
        caps.handles::<OrderPlaced>()
            .handles::<PaymentCaptured>()
            .handles::<OrderShipped>();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use herald_core::CancellationToken;
    use herald_core::error::DomainError;
    use herald_core::handler::DomainEventHandler;
    use herald_core::operation::Operation;
    use herald_test_support::FixedClock;
    use uuid::Uuid;

    use super::{AuditTrail, InventoryReservation};
    use crate::application::store::{InMemoryStore, StoreTransaction};
    use crate::domain::events::OrderPlaced;

    fn placed(quantity: u32) -> OrderPlaced {
        OrderPlaced {
            order_id: Uuid::new_v4(),
            customer: "ada".into(),
            quantity,
            total_cents: 100,
            occurred_at: FixedClock::epoch_2024().0,
        }
    }

    async fn open(store: &Arc<InMemoryStore>) {
        StoreTransaction::new(Arc::clone(store))
            .begin(&CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reservation_fails_when_stock_runs_out() {
        // Arrange
        let store = Arc::new(InMemoryStore::with_stock(3));
        open(&store).await;
        let handler = InventoryReservation::new(Arc::clone(&store));

        // Act
        handler.handle(&placed(2), &CancellationToken::new()).await.unwrap();
        let result = handler.handle(&placed(2), &CancellationToken::new()).await;

        // Assert
        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(store.read(|state| state.stock), 1);
    }

    #[tokio::test]
    async fn test_reservation_observes_cancellation() {
        let store = Arc::new(InMemoryStore::with_stock(3));
        open(&store).await;
        let handler = InventoryReservation::new(Arc::clone(&store));
        let cancellation = CancellationToken::new();
        cancellation.cancel();

        let result = handler.handle(&placed(1), &cancellation).await;

        assert!(matches!(result, Err(DomainError::Cancelled)));
    }

    #[tokio::test]
    async fn test_audit_entries_carry_the_clock_time_and_payload() {
        let store = Arc::new(InMemoryStore::with_stock(0));
        open(&store).await;
        let clock = FixedClock::epoch_2024();
        let handler = AuditTrail::new(Arc::clone(&store), Arc::new(clock));
        let event = placed(4);

        handler.handle(&event, &CancellationToken::new()).await.unwrap();

        let audit = store.read(|state| state.audit.clone());
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0]["kind"], "order_placed");
        assert_eq!(audit[0]["payload"]["quantity"], 4);
        assert_eq!(
            audit[0]["recorded_at"],
            serde_json::to_value(clock.0).unwrap()
        );
    }
}
