//! The event-type-to-handler registry.
//!
//! Handler types declare what they handle through [`HandlerComponent`]. Each
//! `caps.handles::<E>()` call records one monomorphized binding function for
//! the `(handler type, event type)` pair, so resolving the entry point for a
//! pair later is a map lookup rather than any kind of introspection.
//!
//! The catalog is built once at startup and is immutable afterwards. It is
//! owned by the boot step and shared by every unit of work through an `Arc`.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use herald_core::error::{DispatchError, DomainError};
use herald_core::event::{DomainEvent, EventType};
use herald_core::handler::{DomainEventHandler, HandlerType};
use tokio_util::sync::CancellationToken;

use crate::provider::{HandlerFactories, HandlerInstance};

/// A handler entry point bound to one handler instance and one event.
pub type BoundInvocation =
    Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, Result<(), DomainError>> + Send>;

type BindFn = fn(&HandlerInstance, &Arc<dyn DomainEvent>) -> Option<BoundInvocation>;
type TypedFn = fn(&HandlerInstance) -> Option<Box<dyn Any + Send>>;

#[derive(Clone, Copy)]
struct Binding {
    bind: BindFn,
    typed: TypedFn,
}

fn bind<H, E>(instance: &HandlerInstance, event: &Arc<dyn DomainEvent>) -> Option<BoundInvocation>
where
    H: DomainEventHandler<E> + 'static,
    E: DomainEvent,
{
    let handler = instance.downcast::<H>()?;
    let event = Arc::clone(event).into_any().downcast::<E>().ok()?;
    Some(Box::new(move |cancellation: CancellationToken| {
        async move { handler.handle(&event, &cancellation).await }.boxed()
    }))
}

fn typed<H, E>(instance: &HandlerInstance) -> Option<Box<dyn Any + Send>>
where
    H: DomainEventHandler<E> + 'static,
    E: DomainEvent,
{
    let handler: Arc<dyn DomainEventHandler<E>> = instance.downcast::<H>()?;
    Some(Box::new(handler))
}

/// A handler type that can be registered in the [`HandlerCatalog`].
///
/// ```ignore
/// impl HandlerComponent for Mailer {
///     fn capabilities(caps: &mut Capabilities<Self>) {
///         caps.handles::<OrderPlaced>().handles::<OrderShipped>();
///     }
/// }
/// ```
pub trait HandlerComponent: Send + Sync + Sized + 'static {
    /// Declares every event type this handler type handles, in order.
    fn capabilities(caps: &mut Capabilities<Self>);
}

/// The capability declarations of one handler type.
pub struct Capabilities<H> {
    entries: Vec<(EventType, Binding)>,
    _handler: PhantomData<fn() -> H>,
}

impl<H: HandlerComponent> Capabilities<H> {
    fn collect() -> Vec<(EventType, Binding)> {
        let mut caps = Self {
            entries: Vec::new(),
            _handler: PhantomData,
        };
        H::capabilities(&mut caps);
        caps.entries
    }

    /// Declares that `H` handles events of type `E`. Declaring the same event
    /// type twice has no further effect.
    pub fn handles<E>(&mut self) -> &mut Self
    where
        E: DomainEvent,
        H: DomainEventHandler<E>,
    {
        let event_type = EventType::of::<E>();
        if !self.entries.iter().any(|(declared, _)| *declared == event_type) {
            self.entries.push((
                event_type,
                Binding {
                    bind: bind::<H, E>,
                    typed: typed::<H, E>,
                },
            ));
        }
        self
    }
}

/// Immutable map from event type to the ordered handler types registered for
/// it, plus the entry point for every `(handler type, event type)` pair.
pub struct HandlerCatalog {
    handlers: HashMap<EventType, Vec<HandlerType>>,
    bindings: HashMap<(HandlerType, EventType), Binding>,
    handler_order: Vec<HandlerType>,
}

impl HandlerCatalog {
    /// Starts building a catalog.
    #[must_use]
    pub fn builder() -> HandlerCatalogBuilder {
        HandlerCatalogBuilder::default()
    }

    /// Returns the handler types registered for `event_type`, in registration
    /// order. Unregistered event types yield an empty slice.
    #[must_use]
    pub fn lookup(&self, event_type: EventType) -> &[HandlerType] {
        self.handlers
            .get(&event_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns `true` if `handler_type` has an entry point for `event_type`.
    #[must_use]
    pub fn supports(&self, handler_type: HandlerType, event_type: EventType) -> bool {
        self.bindings.contains_key(&(handler_type, event_type))
    }

    /// Every indexed handler type, in registration order.
    #[must_use]
    pub fn handler_types(&self) -> &[HandlerType] {
        &self.handler_order
    }

    /// Binds `instance`'s entry point for the concrete type of `event`.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::HandlerBinding` if the instance's type has no
    /// entry point for the event type.
    pub fn bind(
        &self,
        instance: &HandlerInstance,
        event: &Arc<dyn DomainEvent>,
    ) -> Result<BoundInvocation, DispatchError> {
        let event_type = EventType::of_val(event.as_ref());
        let handler_type = instance.handler_type();
        self.bindings
            .get(&(handler_type, event_type))
            .and_then(|binding| (binding.bind)(instance, event))
            .ok_or(DispatchError::HandlerBinding {
                handler_type,
                event_type,
            })
    }

    /// Views `instance` as a handler of the statically known event type `E`.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::HandlerBinding` if the instance's type does not
    /// handle `E`.
    pub fn typed_handler<E: DomainEvent>(
        &self,
        instance: &HandlerInstance,
    ) -> Result<Arc<dyn DomainEventHandler<E>>, DispatchError> {
        let event_type = EventType::of::<E>();
        let handler_type = instance.handler_type();
        self.bindings
            .get(&(handler_type, event_type))
            .and_then(|binding| (binding.typed)(instance))
            .and_then(|boxed| boxed.downcast::<Arc<dyn DomainEventHandler<E>>>().ok())
            .map(|handler| *handler)
            .ok_or(DispatchError::HandlerBinding {
                handler_type,
                event_type,
            })
    }

    /// Startup validation: every indexed handler type must have a factory.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::MissingHandlerFactory` for the first handler
    /// type without one.
    pub fn validate(&self, factories: &HandlerFactories) -> Result<(), DispatchError> {
        match self
            .handler_order
            .iter()
            .find(|handler_type| !factories.contains(**handler_type))
        {
            Some(&handler_type) => Err(DispatchError::MissingHandlerFactory { handler_type }),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for HandlerCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.handlers.iter().map(|(event_type, handlers)| {
                let names: Vec<&str> = handlers.iter().map(HandlerType::name).collect();
                (event_type.name(), names)
            }))
            .finish()
    }
}

/// Collects handler registrations and produces a [`HandlerCatalog`].
#[derive(Default)]
pub struct HandlerCatalogBuilder {
    handlers: HashMap<EventType, Vec<HandlerType>>,
    bindings: HashMap<(HandlerType, EventType), Binding>,
    handler_order: Vec<HandlerType>,
    known_events: Vec<EventType>,
}

impl HandlerCatalogBuilder {
    /// Indexes handler type `H` under every event type it declares.
    /// Registration order is the order in which handlers are invoked.
    #[must_use]
    pub fn register<H: HandlerComponent>(mut self) -> Self {
        let handler_type = HandlerType::of::<H>();
        let capabilities = Capabilities::<H>::collect();
        if capabilities.is_empty() {
            tracing::debug!(
                handler_type = %handler_type,
                "handler declares no capabilities and is not indexed"
            );
            return self;
        }

        for (event_type, binding) in capabilities {
            if self.bindings.contains_key(&(handler_type, event_type)) {
                continue;
            }
            self.bindings.insert((handler_type, event_type), binding);
            self.handlers.entry(event_type).or_default().push(handler_type);
            tracing::debug!(
                handler_type = %handler_type,
                event_type = %event_type,
                "registered domain event handler"
            );
        }
        if !self.handler_order.contains(&handler_type) {
            self.handler_order.push(handler_type);
        }
        self
    }

    /// Declares an event type the application publishes, so that a missing
    /// handler can be reported at startup.
    #[must_use]
    pub fn known_event<E: DomainEvent>(mut self) -> Self {
        let event_type = EventType::of::<E>();
        if !self.known_events.contains(&event_type) {
            self.known_events.push(event_type);
        }
        self
    }

    /// Finishes the catalog. Known event types without handlers are reported
    /// as warnings; publishing them later is a no-op.
    #[must_use]
    pub fn build(self) -> HandlerCatalog {
        for event_type in &self.known_events {
            if !self.handlers.contains_key(event_type) {
                tracing::warn!(event_type = %event_type, "no handlers for domain event type found");
            }
        }
        tracing::debug!(
            event_types = self.handlers.len(),
            handler_types = self.handler_order.len(),
            "domain event handler catalog built"
        );
        HandlerCatalog {
            handlers: self.handlers,
            bindings: self.bindings,
            handler_order: self.handler_order,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use herald_core::error::{DispatchError, DomainError};
    use herald_core::event::{DomainEvent, EventType};
    use herald_core::handler::{DomainEventHandler, HandlerType};
    use herald_test_support::{InvocationLog, LogCapture};
    use tokio_util::sync::CancellationToken;

    use super::{Capabilities, HandlerCatalog, HandlerComponent};
    use crate::provider::{HandlerFactories, HandlerInstance};

    #[derive(Debug, PartialEq)]
    struct Opened(u32);
    impl DomainEvent for Opened {}

    #[derive(Debug, PartialEq)]
    struct Closed(u32);
    impl DomainEvent for Closed {}

    #[derive(Debug)]
    struct Ignored;
    impl DomainEvent for Ignored {}

    struct Door {
        log: InvocationLog,
    }

    #[async_trait]
    impl DomainEventHandler<Opened> for Door {
        async fn handle(&self, event: &Opened, _: &CancellationToken) -> Result<(), DomainError> {
            self.log.record("door", format!("opened {}", event.0));
            Ok(())
        }
    }

    #[async_trait]
    impl DomainEventHandler<Closed> for Door {
        async fn handle(&self, event: &Closed, _: &CancellationToken) -> Result<(), DomainError> {
            self.log.record("door", format!("closed {}", event.0));
            Ok(())
        }
    }

    impl HandlerComponent for Door {
        fn capabilities(caps: &mut Capabilities<Self>) {
            caps.handles::<Opened>().handles::<Closed>().handles::<Opened>();
        }
    }

    struct Alarm;

    #[async_trait]
    impl DomainEventHandler<Opened> for Alarm {
        async fn handle(&self, _: &Opened, _: &CancellationToken) -> Result<(), DomainError> {
            Ok(())
        }
    }

    impl HandlerComponent for Alarm {
        fn capabilities(caps: &mut Capabilities<Self>) {
            caps.handles::<Opened>();
        }
    }

    struct Inert;

    impl HandlerComponent for Inert {
        fn capabilities(_: &mut Capabilities<Self>) {}
    }

    fn catalog() -> HandlerCatalog {
        HandlerCatalog::builder()
            .register::<Door>()
            .register::<Alarm>()
            .register::<Inert>()
            .build()
    }

    #[test]
    fn test_lookup_preserves_registration_order() {
        // Arrange
        let catalog = catalog();

        // Act
        let opened = catalog.lookup(EventType::of::<Opened>());
        let closed = catalog.lookup(EventType::of::<Closed>());

        // Assert
        assert_eq!(opened, &[HandlerType::of::<Door>(), HandlerType::of::<Alarm>()]);
        assert_eq!(closed, &[HandlerType::of::<Door>()]);
    }

    #[test]
    fn test_lookup_of_unregistered_event_type_is_empty() {
        assert!(catalog().lookup(EventType::of::<Ignored>()).is_empty());
    }

    #[test]
    fn test_handler_without_capabilities_is_not_indexed() {
        let catalog = catalog();

        assert_eq!(
            catalog.handler_types(),
            &[HandlerType::of::<Door>(), HandlerType::of::<Alarm>()]
        );
        assert!(!catalog.supports(HandlerType::of::<Inert>(), EventType::of::<Opened>()));
    }

    #[test]
    fn test_registering_a_handler_twice_does_not_duplicate_it() {
        let catalog = HandlerCatalog::builder()
            .register::<Alarm>()
            .register::<Alarm>()
            .build();

        assert_eq!(catalog.lookup(EventType::of::<Opened>()).len(), 1);
    }

    #[test]
    fn test_build_warns_about_known_event_types_without_handlers() {
        // Arrange
        let capture = LogCapture::new();
        let _guard = capture.set_default();

        // Act
        let _catalog = HandlerCatalog::builder()
            .register::<Door>()
            .known_event::<Opened>()
            .known_event::<Ignored>()
            .build();

        // Assert
        let warnings = capture.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Ignored"), "unexpected warning: {}", warnings[0]);
    }

    #[tokio::test]
    async fn test_bind_selects_the_entry_point_of_the_event_type() {
        // Arrange
        let log = InvocationLog::new();
        let catalog = catalog();
        let door = HandlerInstance::new(Arc::new(Door { log: log.clone() }));
        let closed: Arc<dyn DomainEvent> = Arc::new(Closed(7));

        // Act
        let invocation = catalog.bind(&door, &closed).unwrap();
        invocation(CancellationToken::new()).await.unwrap();

        // Assert
        assert_eq!(log.entries(), vec!["door: closed 7".to_owned()]);
    }

    #[test]
    fn test_bind_fails_for_a_pair_the_catalog_does_not_know() {
        let catalog = catalog();
        let alarm = HandlerInstance::new(Arc::new(Alarm));
        let closed: Arc<dyn DomainEvent> = Arc::new(Closed(1));

        let result = catalog.bind(&alarm, &closed);

        match result {
            Err(DispatchError::HandlerBinding {
                handler_type,
                event_type,
            }) => {
                assert_eq!(handler_type, HandlerType::of::<Alarm>());
                assert_eq!(event_type, EventType::of::<Closed>());
            }
            Err(other) => panic!("expected HandlerBinding, got {other:?}"),
            Ok(_) => panic!("expected HandlerBinding, got a bound invocation"),
        }
    }

    #[tokio::test]
    async fn test_typed_handler_exposes_the_matching_trait_object() {
        let log = InvocationLog::new();
        let catalog = catalog();
        let door = HandlerInstance::new(Arc::new(Door { log: log.clone() }));

        let handler = catalog.typed_handler::<Opened>(&door).unwrap();
        handler.handle(&Opened(3), &CancellationToken::new()).await.unwrap();

        assert_eq!(log.entries(), vec!["door: opened 3".to_owned()]);
        assert!(catalog.typed_handler::<Ignored>(&door).is_err());
    }

    #[test]
    fn test_validate_reports_handler_types_without_factories() {
        let catalog = catalog();
        let mut factories = HandlerFactories::new();
        factories.register(|| Door {
            log: InvocationLog::new(),
        });

        let missing = catalog.validate(&factories);
        factories.register(|| Alarm);
        let complete = catalog.validate(&factories);

        match missing {
            Err(DispatchError::MissingHandlerFactory { handler_type }) => {
                assert_eq!(handler_type, HandlerType::of::<Alarm>());
            }
            other => panic!("expected MissingHandlerFactory, got {other:?}"),
        }
        assert!(complete.is_ok());
    }
}
