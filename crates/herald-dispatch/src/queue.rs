//! The FIFO of handler invocations awaiting the end of the unit of work.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use herald_core::error::HandlerFailure;
use herald_core::event::EventType;
use herald_core::handler::HandlerType;
use tokio_util::sync::CancellationToken;

use crate::catalog::BoundInvocation;

/// One queued handler invocation: a handler instance bound to one event.
pub struct PendingAction {
    event_type: EventType,
    handler_type: HandlerType,
    invocation: BoundInvocation,
}

impl PendingAction {
    /// Creates a pending action from an already bound invocation.
    #[must_use]
    pub fn new(
        event_type: EventType,
        handler_type: HandlerType,
        invocation: BoundInvocation,
    ) -> Self {
        Self {
            event_type,
            handler_type,
            invocation,
        }
    }

    /// The concrete type of the event being handled.
    #[must_use]
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// The concrete type of the handler.
    #[must_use]
    pub fn handler_type(&self) -> HandlerType {
        self.handler_type
    }

    /// Runs the handler and waits for it to finish.
    ///
    /// # Errors
    ///
    /// Returns the handler's error wrapped with the event and handler types.
    pub async fn invoke(self, cancellation: &CancellationToken) -> Result<(), HandlerFailure> {
        let Self {
            event_type,
            handler_type,
            invocation,
        } = self;

        invocation(cancellation.clone()).await.map_err(|source| {
            tracing::error!(
                event_type = %event_type,
                handler_type = %handler_type,
                error = %source,
                "handling of domain event failed"
            );
            HandlerFailure {
                event_type,
                handler_type,
                source,
            }
        })
    }
}

impl fmt::Debug for PendingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingAction")
            .field("event_type", &self.event_type.name())
            .field("handler_type", &self.handler_type.name())
            .finish_non_exhaustive()
    }
}

/// Append-only, internally synchronized FIFO of pending actions.
///
/// Any number of producers may enqueue concurrently. Dequeue order is
/// enqueue order.
#[derive(Debug, Default)]
pub struct PendingActionQueue {
    actions: Mutex<VecDeque<PendingAction>>,
}

impl PendingActionQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<PendingAction>> {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends one action.
    pub fn enqueue(&self, action: PendingAction) {
        self.lock().push_back(action);
    }

    /// Appends several actions as one contiguous run; concurrent producers
    /// cannot interleave with it.
    pub fn enqueue_all(&self, actions: impl IntoIterator<Item = PendingAction>) {
        self.lock().extend(actions);
    }

    /// Removes and returns the oldest action.
    #[must_use]
    pub fn try_dequeue(&self) -> Option<PendingAction> {
        self.lock().pop_front()
    }

    /// Number of queued actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops every queued action and returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut actions = self.lock();
        let dropped = actions.len();
        actions.clear();
        dropped
    }
}
