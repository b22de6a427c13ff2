//! Domain event abstractions.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Runtime identity of an event type.
///
/// Two `EventType`s are equal when they describe the same concrete Rust type;
/// the name is carried for diagnostics only.
#[derive(Debug, Clone, Copy)]
pub struct EventType {
    id: TypeId,
    name: &'static str,
}

impl EventType {
    /// Returns the identity of the statically known event type `E`.
    #[must_use]
    pub fn of<E: DomainEvent>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: std::any::type_name::<E>(),
        }
    }

    /// Returns the identity of the concrete type behind a type-erased event.
    ///
    /// This is always the most-derived type the event was created as, never
    /// the trait object it is currently viewed through.
    #[must_use]
    pub fn of_val(event: &dyn DomainEvent) -> Self {
        event.event_type()
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

impl PartialEq for EventType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventType {}

impl Hash for EventType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Type-erased access to a domain event's concrete type.
///
/// Implemented for every [`DomainEvent`]; never implement it by hand.
pub trait AnyEvent {
    /// Returns the concrete event type.
    fn event_type(&self) -> EventType;

    /// Views the event as `Any` for downcasting by reference.
    fn as_any(&self) -> &dyn Any;

    /// Converts a shared event into `Any` for downcasting to `Arc<E>`.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<E: DomainEvent> AnyEvent for E {
    fn event_type(&self) -> EventType {
        EventType::of::<E>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Trait that all domain events implement.
///
/// An event is an immutable value stating that something of domain
/// significance happened. Its identity for dispatch purposes is its concrete
/// type; no fields are required.
pub trait DomainEvent: Any + Send + Sync + fmt::Debug + AnyEvent {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct LightsOn;
    impl DomainEvent for LightsOn {}

    #[derive(Debug)]
    struct LightsOff;
    impl DomainEvent for LightsOff {}

    #[test]
    fn test_of_val_reports_concrete_type_behind_trait_object() {
        // Arrange
        let event: Arc<dyn DomainEvent> = Arc::new(LightsOn);

        // Act
        let event_type = EventType::of_val(event.as_ref());

        // Assert
        assert_eq!(event_type, EventType::of::<LightsOn>());
        assert_ne!(event_type, EventType::of::<LightsOff>());
        assert!(event_type.name().ends_with("LightsOn"));
    }

    #[test]
    fn test_into_any_recovers_the_typed_event() {
        let event: Arc<dyn DomainEvent> = Arc::new(LightsOn);

        let typed = event.into_any().downcast::<LightsOn>();

        assert!(typed.is_ok());
    }

    #[test]
    fn test_equality_ignores_name_and_uses_type_identity() {
        let a = EventType::of::<LightsOff>();
        let b = EventType::of_val(&LightsOff);
        assert_eq!(a, b);
        assert_eq!(a.id(), TypeId::of::<LightsOff>());
        assert_eq!(a.to_string(), a.name());
    }
}
