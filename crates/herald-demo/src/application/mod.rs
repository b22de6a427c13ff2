//! Application layer for the ordering context.

pub mod handlers;
pub mod service;
pub mod store;
