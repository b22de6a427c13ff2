//! Domain event handler abstractions.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::DomainError;
use crate::event::DomainEvent;

/// A component that reacts to domain events of type `E`.
///
/// A single handler type may implement this trait for several event types;
/// each implementation is an independent entry point and only ever receives
/// events of its own `E`.
#[async_trait]
pub trait DomainEventHandler<E: DomainEvent>: Send + Sync {
    /// Handle one event.
    ///
    /// # Errors
    ///
    /// Any error aborts the surrounding unit of work.
    async fn handle(
        &self,
        event: &E,
        cancellation: &CancellationToken,
    ) -> Result<(), DomainError>;
}

/// Runtime identity of a handler implementation type.
#[derive(Debug, Clone, Copy)]
pub struct HandlerType {
    id: TypeId,
    name: &'static str,
}

impl HandlerType {
    /// Returns the identity of handler type `H`.
    #[must_use]
    pub fn of<H: Any>() -> Self {
        Self {
            id: TypeId::of::<H>(),
            name: std::any::type_name::<H>(),
        }
    }

    /// The underlying `TypeId`.
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The fully qualified Rust type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for HandlerType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for HandlerType {}

impl Hash for HandlerType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for HandlerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
