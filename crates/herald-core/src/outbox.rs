//! Per-entity collection of domain events awaiting publication.

use std::sync::Arc;

use crate::event::DomainEvent;

/// Collects the domain events raised by one entity until they are published.
///
/// The outbox behaves as a set: adding an event equal to one already held is a
/// no-op. Events are yielded in first-insertion order, but callers should not
/// depend on ordering among one entity's own events.
///
/// Reading the outbox does not clear it. Publishing the same outbox twice
/// publishes its events twice.
#[derive(Debug, Default, Clone)]
pub struct DomainEventOutBox {
    events: Vec<Arc<dyn DomainEvent>>,
}

impl DomainEventOutBox {
    /// Creates an empty outbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an event unless an equal event is already held.
    ///
    /// Returns `true` if the event was added.
    pub fn add<E>(&mut self, event: E) -> bool
    where
        E: DomainEvent + PartialEq,
    {
        let duplicate = self.events.iter().any(|held| {
            held.as_any().downcast_ref::<E>() == Some(&event)
        });
        if duplicate {
            return false;
        }
        self.events.push(Arc::new(event));
        true
    }

    /// Iterates over all held events without removing them.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn DomainEvent>> {
        self.events.iter()
    }

    /// Number of distinct events held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if no events are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl<'a> IntoIterator for &'a DomainEventOutBox {
    type Item = &'a Arc<dyn DomainEvent>;
    type IntoIter = std::slice::Iter<'a, Arc<dyn DomainEvent>>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use crate::event::{DomainEvent, EventType};

    use super::DomainEventOutBox;

    #[derive(Debug, Clone, PartialEq)]
    struct PriceChanged {
        sku: String,
        cents: u64,
    }
    impl DomainEvent for PriceChanged {}

    #[derive(Debug, Clone, PartialEq)]
    struct Discontinued {
        sku: String,
    }
    impl DomainEvent for Discontinued {}

    fn price(sku: &str, cents: u64) -> PriceChanged {
        PriceChanged {
            sku: sku.to_owned(),
            cents,
        }
    }

    #[test]
    fn test_add_coalesces_equal_events() {
        // Arrange
        let mut outbox = DomainEventOutBox::new();

        // Act
        let first = outbox.add(price("A-1", 100));
        let second = outbox.add(price("A-1", 100));

        // Assert
        assert!(first);
        assert!(!second);
        assert_eq!(outbox.len(), 1);
    }

    #[test]
    fn test_add_keeps_distinct_values_of_the_same_type() {
        let mut outbox = DomainEventOutBox::new();

        outbox.add(price("A-1", 100));
        outbox.add(price("A-1", 120));

        assert_eq!(outbox.len(), 2);
    }

    #[test]
    fn test_events_of_different_types_never_compare_equal() {
        let mut outbox = DomainEventOutBox::new();

        outbox.add(price("A-1", 100));
        outbox.add(Discontinued {
            sku: "A-1".to_owned(),
        });

        let types: Vec<EventType> = outbox
            .iter()
            .map(|event| EventType::of_val(event.as_ref()))
            .collect();
        assert_eq!(
            types,
            vec![EventType::of::<PriceChanged>(), EventType::of::<Discontinued>()]
        );
    }

    #[test]
    fn test_iteration_is_restartable_and_does_not_drain() {
        let mut outbox = DomainEventOutBox::new();
        outbox.add(price("B-7", 5));

        assert_eq!((&outbox).into_iter().count(), 1);
        assert_eq!(outbox.iter().count(), 1);
        assert!(!outbox.is_empty());
    }
}
