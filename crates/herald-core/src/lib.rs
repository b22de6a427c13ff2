//! Herald Core — shared domain event abstractions.
//!
//! This crate defines the traits and types that domain code, event handlers
//! and the dispatch engine all depend on. It contains no dispatch logic.

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod event;
pub mod handler;
pub mod operation;
pub mod outbox;
pub mod publisher;

pub use tokio_util::sync::CancellationToken;
