//! The per-unit-of-work domain event aggregator.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use herald_core::error::DispatchError;
use herald_core::event::{DomainEvent, EventType};
use herald_core::publisher::{DomainEventAggregator, DomainEventPublisher};
use tokio_util::sync::CancellationToken;

use crate::config::{DispatchConfig, DrainPolicy};
use crate::queue::{PendingAction, PendingActionQueue};
use crate::resolver::HandlerResolver;

/// Collects the handler invocations caused by published events and executes
/// them when the unit of work completes.
///
/// One aggregator belongs to exactly one unit of work. Publishing is safe from
/// any number of concurrent producers; draining is done by the owner of the
/// unit of work and never runs concurrently with itself.
#[derive(Debug)]
pub struct EventAggregator {
    resolver: HandlerResolver,
    queue: PendingActionQueue,
    config: DispatchConfig,
    draining: AtomicBool,
}

impl EventAggregator {
    /// Creates an aggregator with an empty queue.
    #[must_use]
    pub fn new(resolver: HandlerResolver, config: DispatchConfig) -> Self {
        Self {
            resolver,
            queue: PendingActionQueue::new(),
            config,
            draining: AtomicBool::new(false),
        }
    }

    /// The resolver used to find handlers.
    #[must_use]
    pub fn resolver(&self) -> &HandlerResolver {
        &self.resolver
    }

    /// Number of invocations waiting for the next drain.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    fn report_unhandled(&self, event_type: EventType) {
        if self.config.warn_on_unhandled {
            tracing::warn!(event_type = %event_type, "no handlers registered for domain event");
        } else {
            tracing::debug!(event_type = %event_type, "no handlers registered for domain event");
        }
    }
}

impl DomainEventPublisher for EventAggregator {
    fn publish_domain_event(&self, event: Arc<dyn DomainEvent>) -> Result<usize, DispatchError> {
        let event_type = EventType::of_val(event.as_ref());
        let instances = self.resolver.resolve_instances(event_type);
        if instances.is_empty() {
            self.report_unhandled(event_type);
            return Ok(0);
        }

        // Bind everything before queueing so a binding failure leaves the
        // queue untouched.
        let actions = instances
            .iter()
            .map(|instance| {
                let invocation = self.resolver.bind_invocable(instance, &event)?;
                tracing::debug!(
                    handler_type = %instance.handler_type(),
                    domain_event = ?event,
                    "invocation registered; it will be executed on completion of the operation"
                );
                Ok(PendingAction::new(
                    event_type,
                    instance.handler_type(),
                    invocation,
                ))
            })
            .collect::<Result<Vec<_>, DispatchError>>()?;

        let queued = actions.len();
        self.queue.enqueue_all(actions);
        tracing::debug!(event_type = %event_type, queued, "domain event published");
        Ok(queued)
    }
}

#[async_trait]
impl DomainEventAggregator for EventAggregator {
    async fn raise_events(&self, cancellation: &CancellationToken) -> Result<usize, DispatchError> {
        let _guard = DrainGuard::acquire(&self.draining).ok_or(DispatchError::DrainInProgress)?;

        let mut invoked = 0;
        let mut failures = Vec::new();
        loop {
            if cancellation.is_cancelled() && !self.queue.is_empty() {
                let remaining = self.queue.len();
                tracing::warn!(remaining, "raising domain events cancelled");
                if !failures.is_empty() {
                    return Err(DispatchError::HandlersFailed(failures));
                }
                return Err(DispatchError::Cancelled { remaining });
            }
            let Some(action) = self.queue.try_dequeue() else {
                break;
            };

            tracing::debug!(
                event_type = %action.event_type(),
                handler_type = %action.handler_type(),
                "invoking domain event handler"
            );
            invoked += 1;
            if let Err(failure) = action.invoke(cancellation).await {
                match self.config.drain_policy {
                    DrainPolicy::FailFast => return Err(failure.into()),
                    DrainPolicy::RunAll => failures.push(failure),
                }
            }
        }

        if !failures.is_empty() {
            return Err(DispatchError::HandlersFailed(failures));
        }
        if invoked > 0 {
            tracing::debug!(invoked, "domain events raised");
        }
        Ok(invoked)
    }
}

impl Drop for EventAggregator {
    fn drop(&mut self) {
        let discarded = self.queue.clear();
        if discarded > 0 {
            tracing::debug!(discarded, "unit of work ended with unraised domain events");
        }
    }
}

/// Marks an aggregator as draining for as long as the guard lives.
struct DrainGuard<'a>(&'a AtomicBool);

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
