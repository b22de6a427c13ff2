//! Error types.

use thiserror::Error;
use uuid::Uuid;

use crate::event::EventType;
use crate::handler::HandlerType;

/// Error raised by domain code and event handlers.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    /// The work was abandoned because cancellation was requested.
    #[error("operation cancelled")]
    Cancelled,
}

/// A handler invocation that failed while domain events were raised.
///
/// The handler's own error is preserved unchanged as the source.
#[derive(Debug, Error)]
#[error("handling of {event_type} by {handler_type} failed: {source}")]
pub struct HandlerFailure {
    /// The event being handled.
    pub event_type: EventType,
    /// The handler that failed.
    pub handler_type: HandlerType,
    /// The error returned by the handler.
    #[source]
    pub source: DomainError,
}

/// Errors produced by the publish and drain sides of the dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The catalog lists a handler for an event type but holds no entry point
    /// for the pair. This is a wiring defect, not a runtime condition.
    #[error("handler binding failed: {handler_type} has no entry point for {event_type}")]
    HandlerBinding {
        /// The handler that could not be bound.
        handler_type: HandlerType,
        /// The event type it was expected to handle.
        event_type: EventType,
    },

    /// A catalogued handler type has no factory to create instances from.
    #[error("no factory registered for handler {handler_type}")]
    MissingHandlerFactory {
        /// The handler type without a factory.
        handler_type: HandlerType,
    },

    /// A handler failed; the remaining queued actions were not executed.
    #[error(transparent)]
    HandlerExecution(#[from] HandlerFailure),

    /// One or more handlers failed while every queued action was executed.
    #[error("{} domain event handlers failed", .0.len())]
    HandlersFailed(Vec<HandlerFailure>),

    /// A drain was requested while another drain of the same aggregator was
    /// still running.
    #[error("domain events are already being raised in this scope")]
    DrainInProgress,

    /// Cancellation was requested before all queued actions were executed.
    #[error("raising domain events was cancelled with {remaining} actions pending")]
    Cancelled {
        /// Number of actions that were not executed.
        remaining: usize,
    },
}

/// Error returned by the unit-of-work lifecycle.
#[derive(Debug, Error)]
pub enum OperationError {
    /// Raising domain events failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The operation itself failed.
    #[error(transparent)]
    Domain(#[from] DomainError),
}
