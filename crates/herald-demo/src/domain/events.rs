//! Domain events for the ordering context.

use chrono::{DateTime, Utc};
use herald_core::event::DomainEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emitted when a customer places an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    /// The order identifier.
    pub order_id: Uuid,
    /// Who placed the order.
    pub customer: String,
    /// Number of units ordered.
    pub quantity: u32,
    /// Order total in cents.
    pub total_cents: u64,
    /// When the order was placed.
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for OrderPlaced {}

/// Emitted when payment for an order has been captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCaptured {
    /// The order identifier.
    pub order_id: Uuid,
    /// Captured amount in cents.
    pub amount_cents: u64,
    /// When the payment was captured.
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for PaymentCaptured {}

/// Emitted when an order leaves the warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderShipped {
    /// The order identifier.
    pub order_id: Uuid,
    /// The carrier handling the shipment.
    pub carrier: String,
    /// When the order was shipped.
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for OrderShipped {}
