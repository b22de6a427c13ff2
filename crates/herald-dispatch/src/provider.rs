//! Handler instantiation.
//!
//! The dispatcher never constructs handlers itself. It asks a
//! [`ServiceProvider`] for the instances that play the role of handler for an
//! event type within the current unit of work. [`ScopedServiceProvider`] is the
//! default provider: it builds instances from factories registered at boot and
//! keeps them for the lifetime of one scope.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use herald_core::event::EventType;
use herald_core::handler::HandlerType;

/// A live handler, tagged with its concrete type.
#[derive(Clone)]
pub struct HandlerInstance {
    handler_type: HandlerType,
    instance: Arc<dyn Any + Send + Sync>,
}

impl HandlerInstance {
    /// Wraps a typed handler. The type tag is derived from `H`, so it always
    /// matches the wrapped value.
    #[must_use]
    pub fn new<H: Send + Sync + 'static>(handler: Arc<H>) -> Self {
        Self {
            handler_type: HandlerType::of::<H>(),
            instance: handler,
        }
    }

    /// The concrete type of the wrapped handler.
    #[must_use]
    pub fn handler_type(&self) -> HandlerType {
        self.handler_type
    }

    /// Recovers the typed handler, or `None` if it is not an `H`.
    #[must_use]
    pub fn downcast<H: Send + Sync + 'static>(&self) -> Option<Arc<H>> {
        Arc::clone(&self.instance).downcast::<H>().ok()
    }

    /// Returns `true` if both values wrap the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }
}

impl fmt::Debug for HandlerInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerInstance")
            .field("handler_type", &self.handler_type.name())
            .finish_non_exhaustive()
    }
}

/// Source of handler instances for one unit of work.
pub trait ServiceProvider: Send + Sync {
    /// Returns every instance of `handler_type` that should receive events of
    /// `event_type`. May return zero, one or several instances; all of them
    /// participate. Instances must never be shared across units of work.
    fn get_all(&self, handler_type: HandlerType, event_type: EventType) -> Vec<HandlerInstance>;
}

type Factory = Arc<dyn Fn() -> HandlerInstance + Send + Sync>;

/// Boot-time registry of handler factories.
///
/// More than one factory may be registered for the same handler type; each
/// produces its own instance per scope and all of them receive events.
#[derive(Clone, Default)]
pub struct HandlerFactories {
    factories: HashMap<HandlerType, Vec<Factory>>,
}

impl HandlerFactories {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory producing handlers of type `H`.
    pub fn register<H, F>(&mut self, factory: F)
    where
        H: Send + Sync + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move || HandlerInstance::new(Arc::new(factory())));
        self.factories
            .entry(HandlerType::of::<H>())
            .or_default()
            .push(factory);
    }

    /// Returns `true` if at least one factory exists for `handler_type`.
    #[must_use]
    pub fn contains(&self, handler_type: HandlerType) -> bool {
        self.factories
            .get(&handler_type)
            .is_some_and(|factories| !factories.is_empty())
    }

    fn create_all(&self, handler_type: HandlerType) -> Vec<HandlerInstance> {
        self.factories
            .get(&handler_type)
            .map(|factories| factories.iter().map(|factory| factory()).collect())
            .unwrap_or_default()
    }
}

impl fmt::Debug for HandlerFactories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.factories
                    .iter()
                    .map(|(handler_type, factories)| (handler_type.name(), factories.len())),
            )
            .finish()
    }
}

/// A [`ServiceProvider`] scoped to one unit of work.
///
/// Each handler type is instantiated on first request; later requests within
/// the same scope, for any event type, receive the same instances.
pub struct ScopedServiceProvider {
    factories: Arc<HandlerFactories>,
    instances: Mutex<HashMap<HandlerType, Vec<HandlerInstance>>>,
}

impl ScopedServiceProvider {
    /// Opens a new scope over the given factories.
    #[must_use]
    pub fn new(factories: Arc<HandlerFactories>) -> Self {
        Self {
            factories,
            instances: Mutex::new(HashMap::new()),
        }
    }
}

impl ServiceProvider for ScopedServiceProvider {
    fn get_all(&self, handler_type: HandlerType, event_type: EventType) -> Vec<HandlerInstance> {
        let mut instances = self.instances.lock().unwrap_or_else(PoisonError::into_inner);
        let scoped = instances.entry(handler_type).or_insert_with(|| {
            let created = self.factories.create_all(handler_type);
            tracing::trace!(
                handler_type = %handler_type,
                event_type = %event_type,
                instances = created.len(),
                "instantiated scoped handlers"
            );
            created
        });
        scoped.clone()
    }
}

impl fmt::Debug for ScopedServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedServiceProvider")
            .field("factories", &self.factories)
            .finish_non_exhaustive()
    }
}
