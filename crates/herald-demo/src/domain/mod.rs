//! Domain layer for the ordering context.

pub mod events;
pub mod order;
