//! The order entity.

use herald_core::aggregate::HasDomainEvents;
use herald_core::clock::Clock;
use herald_core::error::DomainError;
use herald_core::outbox::DomainEventOutBox;
use uuid::Uuid;

use super::events::{OrderPlaced, OrderShipped, PaymentCaptured};

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    /// Placed, awaiting payment.
    Placed,
    /// Paid, awaiting shipment.
    Paid,
    /// Handed to a carrier.
    Shipped,
}

/// An order. State changes are recorded in its outbox and published by the
/// application layer.
#[derive(Debug, Clone)]
pub struct Order {
    /// Order identifier.
    pub id: Uuid,
    customer: String,
    quantity: u32,
    total_cents: u64,
    status: OrderStatus,
    events: DomainEventOutBox,
}

impl Order {
    /// Places a new order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the customer is blank or the
    /// quantity is zero.
    pub fn place(
        id: Uuid,
        customer: &str,
        quantity: u32,
        total_cents: u64,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        let customer = customer.trim();
        if customer.is_empty() {
            return Err(DomainError::Validation("customer must not be empty".into()));
        }
        if quantity == 0 {
            return Err(DomainError::Validation("quantity must be positive".into()));
        }

        let mut order = Self {
            id,
            customer: customer.to_owned(),
            quantity,
            total_cents,
            status: OrderStatus::Placed,
            events: DomainEventOutBox::new(),
        };
        order.events.add(OrderPlaced {
            order_id: id,
            customer: order.customer.clone(),
            quantity,
            total_cents,
            occurred_at: clock.now(),
        });
        Ok(order)
    }

    /// Records the captured payment.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the order is not awaiting payment
    /// or the amount differs from the order total.
    pub fn capture_payment(
        &mut self,
        amount_cents: u64,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.status != OrderStatus::Placed {
            return Err(DomainError::Validation(format!(
                "order {} is not awaiting payment",
                self.id
            )));
        }
        if amount_cents != self.total_cents {
            return Err(DomainError::Validation(format!(
                "captured {amount_cents} but order {} totals {}",
                self.id, self.total_cents
            )));
        }
        self.status = OrderStatus::Paid;
        self.events.add(PaymentCaptured {
            order_id: self.id,
            amount_cents,
            occurred_at: clock.now(),
        });
        Ok(())
    }

    /// Hands a paid order to a carrier.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the order has not been paid.
    pub fn ship(&mut self, carrier: &str, clock: &dyn Clock) -> Result<(), DomainError> {
        if self.status != OrderStatus::Paid {
            return Err(DomainError::Validation(format!(
                "order {} cannot ship before payment",
                self.id
            )));
        }
        self.status = OrderStatus::Shipped;
        self.events.add(OrderShipped {
            order_id: self.id,
            carrier: carrier.to_owned(),
            occurred_at: clock.now(),
        });
        Ok(())
    }

    /// Who placed the order.
    #[must_use]
    pub fn customer(&self) -> &str {
        &self.customer
    }

    /// Number of units ordered.
    #[must_use]
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Order total in cents.
    #[must_use]
    pub fn total_cents(&self) -> u64 {
        self.total_cents
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Forgets recorded events once they have been published.
    pub fn clear_events(&mut self) {
        self.events = DomainEventOutBox::new();
    }
}

impl HasDomainEvents for Order {
    fn domain_events(&self) -> &DomainEventOutBox {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use herald_core::aggregate::HasDomainEvents;
    use herald_core::error::DomainError;
    use herald_test_support::FixedClock;
    use uuid::Uuid;

    use super::{Order, OrderStatus};
    use crate::domain::events::{OrderPlaced, PaymentCaptured};

    #[test]
    fn test_place_records_order_placed() {
        // Arrange
        let clock = FixedClock::epoch_2024();
        let id = Uuid::new_v4();

        // Act
        let order = Order::place(id, "  ada ", 2, 1_500, &clock).unwrap();

        // Assert
        assert_eq!(order.customer(), "ada");
        assert_eq!(order.status(), OrderStatus::Placed);
        let events: Vec<_> = order.domain_events().iter().collect();
        assert_eq!(events.len(), 1);
        let placed = events[0].as_any().downcast_ref::<OrderPlaced>().unwrap();
        assert_eq!(placed.order_id, id);
        assert_eq!(placed.occurred_at, clock.0);
    }

    #[test]
    fn test_place_rejects_zero_quantity() {
        let result = Order::place(Uuid::new_v4(), "ada", 0, 0, &FixedClock::epoch_2024());

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_capturing_the_same_payment_twice_fails_without_recording_it_twice() {
        let clock = FixedClock::epoch_2024();
        let mut order = Order::place(Uuid::new_v4(), "ada", 1, 900, &clock).unwrap();

        order.capture_payment(900, &clock).unwrap();
        let again = order.capture_payment(900, &clock);

        assert!(again.is_err());
        let captured = order
            .domain_events()
            .iter()
            .filter(|event| event.as_any().is::<PaymentCaptured>())
            .count();
        assert_eq!(captured, 1);
    }

    #[test]
    fn test_ship_requires_payment() {
        let clock = FixedClock::epoch_2024();
        let mut order = Order::place(Uuid::new_v4(), "ada", 1, 900, &clock).unwrap();

        let result = order.ship("parcel-co", &clock);

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(order.status(), OrderStatus::Placed);
    }
}
