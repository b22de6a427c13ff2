//! Entities that record domain events.

use crate::outbox::DomainEventOutBox;

/// An entity that records the domain events it raises in its own outbox,
/// without depending on a publisher.
///
/// The owner of the entity hands it to
/// [`DomainEventPublisher::publish_domain_events`](crate::publisher::DomainEventPublisher::publish_domain_events)
/// once the mutation is finished.
pub trait HasDomainEvents {
    /// Returns the events raised since the entity was loaded or created.
    fn domain_events(&self) -> &DomainEventOutBox;
}
