//! In-memory transactional store for the ordering context.
//!
//! Writes go to a staged copy of the state that becomes visible only when the
//! surrounding [`StoreTransaction`] completes. Cancelling discards the staged
//! copy, including everything event handlers wrote.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use herald_core::CancellationToken;
use herald_core::error::{DomainError, OperationError};
use herald_core::operation::Operation;
use uuid::Uuid;

use crate::domain::order::Order;

/// A message sent to a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// The customer addressed.
    pub customer: String,
    /// The message text.
    pub message: String,
}

/// Everything the ordering context persists.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    /// Orders by identifier.
    pub orders: HashMap<Uuid, Order>,
    /// Units available for new orders.
    pub stock: u32,
    /// Stock reserved per order, in reservation order.
    pub reservations: Vec<(Uuid, u32)>,
    /// Customer notifications, in sending order.
    pub notifications: Vec<Notification>,
    /// Audit trail entries, in recording order.
    pub audit: Vec<serde_json::Value>,
}

#[derive(Debug, Default)]
struct Inner {
    committed: StoreState,
    staged: Option<StoreState>,
}

/// Process-local store with a single active transaction at a time.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    /// Creates a store holding `units` of stock.
    #[must_use]
    pub fn with_stock(units: u32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                committed: StoreState {
                    stock: units,
                    ..StoreState::default()
                },
                staged: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The committed state.
    #[must_use]
    pub fn snapshot(&self) -> StoreState {
        self.lock().committed.clone()
    }

    /// Returns `true` while a transaction is open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.lock().staged.is_some()
    }

    /// Reads the state as the current transaction sees it, or the committed
    /// state outside a transaction.
    pub fn read<T>(&self, f: impl FnOnce(&StoreState) -> T) -> T {
        let inner = self.lock();
        f(inner.staged.as_ref().unwrap_or(&inner.committed))
    }

    /// Applies `f` to the staged state. A failing `f` leaves no partial writes.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` outside a transaction, or the
    /// error returned by `f`.
    pub fn write<T>(
        &self,
        f: impl FnOnce(&mut StoreState) -> Result<T, DomainError>,
    ) -> Result<T, DomainError> {
        let mut inner = self.lock();
        let staged = inner
            .staged
            .as_mut()
            .ok_or_else(|| DomainError::Infrastructure("no active transaction".into()))?;
        let mut draft = staged.clone();
        let value = f(&mut draft)?;
        *staged = draft;
        Ok(value)
    }

    /// Loads an order as the current transaction sees it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if no such order exists.
    pub fn load_order(&self, order_id: Uuid) -> Result<Order, DomainError> {
        self.read(|state| state.orders.get(&order_id).cloned())
            .ok_or(DomainError::AggregateNotFound(order_id))
    }

    /// Stages an order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` outside a transaction.
    pub fn save_order(&self, order: Order) -> Result<(), DomainError> {
        self.write(|state| {
            state.orders.insert(order.id, order);
            Ok(())
        })
    }

    fn begin(&self) -> Result<(), DomainError> {
        let mut inner = self.lock();
        if inner.staged.is_some() {
            return Err(DomainError::Infrastructure(
                "a transaction is already active".into(),
            ));
        }
        inner.staged = Some(inner.committed.clone());
        Ok(())
    }

    fn commit(&self) -> Result<(), DomainError> {
        let mut inner = self.lock();
        let staged = inner
            .staged
            .take()
            .ok_or_else(|| DomainError::Infrastructure("no active transaction".into()))?;
        inner.committed = staged;
        Ok(())
    }

    fn rollback(&self) {
        self.lock().staged = None;
    }
}

/// The unit of work over an [`InMemoryStore`].
#[derive(Debug)]
pub struct StoreTransaction {
    store: Arc<InMemoryStore>,
}

impl StoreTransaction {
    /// Creates a transaction that begins when the operation begins.
    #[must_use]
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Operation for StoreTransaction {
    async fn begin(&mut self, _cancellation: &CancellationToken) -> Result<(), OperationError> {
        self.store.begin()?;
        tracing::debug!("store transaction started");
        Ok(())
    }

    async fn complete(&mut self, _cancellation: &CancellationToken) -> Result<(), OperationError> {
        self.store.commit()?;
        tracing::debug!("store transaction committed");
        Ok(())
    }

    async fn cancel(&mut self, _cancellation: &CancellationToken) -> Result<(), OperationError> {
        self.store.rollback();
        tracing::debug!("store transaction rolled back");
        Ok(())
    }
}
