//! Publish-side and drain-side entry points of the dispatcher.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::aggregate::HasDomainEvents;
use crate::error::DispatchError;
use crate::event::DomainEvent;
use crate::outbox::DomainEventOutBox;

/// The API domain code uses to announce domain events.
///
/// Publishing never runs handler code. Every handler registered for the
/// event's concrete type is queued and executed later, when the surrounding
/// unit of work completes. Handler failures surface there and abort the unit
/// of work.
pub trait DomainEventPublisher: Send + Sync {
    /// Queues one invocation per handler registered for the event's concrete
    /// type and returns how many were queued. An event without handlers
    /// queues nothing and is not an error.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::HandlerBinding` if a catalogued handler has no
    /// entry point for the event type.
    fn publish_domain_event(&self, event: Arc<dyn DomainEvent>) -> Result<usize, DispatchError>;

    /// Publishes every event held by `outbox`.
    ///
    /// The outbox is not cleared; publishing it twice queues its events twice.
    ///
    /// # Errors
    ///
    /// Stops at the first event that fails to publish.
    fn publish_domain_events_from_outbox(
        &self,
        outbox: &DomainEventOutBox,
    ) -> Result<usize, DispatchError> {
        let mut queued = 0;
        for event in outbox {
            queued += self.publish_domain_event(Arc::clone(event))?;
        }
        Ok(queued)
    }

    /// Publishes the events recorded by an entity.
    ///
    /// # Errors
    ///
    /// Stops at the first event that fails to publish.
    fn publish_domain_events(&self, entity: &dyn HasDomainEvents) -> Result<usize, DispatchError> {
        self.publish_domain_events_from_outbox(entity.domain_events())
    }
}

/// Convenience methods for publishing owned event values.
pub trait DomainEventPublisherExt: DomainEventPublisher {
    /// Publishes an owned event value.
    ///
    /// # Errors
    ///
    /// See [`DomainEventPublisher::publish_domain_event`].
    fn publish<E: DomainEvent>(&self, event: E) -> Result<usize, DispatchError> {
        self.publish_domain_event(Arc::new(event))
    }
}

impl<P: DomainEventPublisher + ?Sized> DomainEventPublisherExt for P {}

/// Drains the events published in one unit of work.
///
/// See <https://martinfowler.com/eaaDev/EventAggregator.html>.
#[async_trait]
pub trait DomainEventAggregator: Send + Sync {
    /// Executes every queued handler invocation in publish order, awaiting
    /// each before starting the next. Returns the number of invocations.
    /// Draining an empty queue succeeds and does nothing.
    ///
    /// # Errors
    ///
    /// Returns the first handler failure (or all of them, depending on the
    /// drain policy). Invocations after a failure are not executed under the
    /// default policy.
    async fn raise_events(&self, cancellation: &CancellationToken) -> Result<usize, DispatchError>;
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::aggregate::HasDomainEvents;
    use crate::error::DispatchError;
    use crate::event::{DomainEvent, EventType};
    use crate::outbox::DomainEventOutBox;

    use super::{DomainEventPublisher, DomainEventPublisherExt};

    #[derive(Debug, PartialEq)]
    struct Renamed(&'static str);
    impl DomainEvent for Renamed {}

    /// Queues two actions per event and remembers what it saw.
    #[derive(Default)]
    struct Doubling {
        seen: Mutex<Vec<EventType>>,
    }

    impl DomainEventPublisher for Doubling {
        fn publish_domain_event(&self, event: Arc<dyn DomainEvent>) -> Result<usize, DispatchError> {
            self.seen.lock().unwrap().push(EventType::of_val(event.as_ref()));
            Ok(2)
        }
    }

    struct Account {
        events: DomainEventOutBox,
    }

    impl HasDomainEvents for Account {
        fn domain_events(&self) -> &DomainEventOutBox {
            &self.events
        }
    }

    #[test]
    fn test_outbox_publication_sums_queued_actions() {
        // Arrange
        let publisher = Doubling::default();
        let mut events = DomainEventOutBox::new();
        events.add(Renamed("a"));
        events.add(Renamed("b"));
        let account = Account { events };

        // Act
        let queued = publisher.publish_domain_events(&account).unwrap();

        // Assert
        assert_eq!(queued, 4);
        assert_eq!(publisher.seen.lock().unwrap().len(), 2);
        assert_eq!(account.domain_events().len(), 2);
    }

    #[test]
    fn test_publish_wraps_owned_values() {
        let publisher = Doubling::default();

        let queued = publisher.publish(Renamed("c")).unwrap();

        assert_eq!(queued, 2);
        assert_eq!(
            publisher.seen.lock().unwrap().as_slice(),
            &[EventType::of::<Renamed>()]
        );
    }
}
