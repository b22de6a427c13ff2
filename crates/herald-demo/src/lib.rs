//! Herald demo — a small ordering context whose side effects run as deferred
//! domain event handlers.
//!
//! Placing, paying for and shipping an order are recorded as domain events on
//! the [`domain::order::Order`] entity. Handlers reserve stock, notify the
//! customer and keep an audit trail; all of them run inside the same
//! [`application::store::StoreTransaction`] as the business change, so a
//! failing handler rolls the whole unit of work back.

pub mod application;
pub mod boot;
pub mod domain;
pub mod error;
