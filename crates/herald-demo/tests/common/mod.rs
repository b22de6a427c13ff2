//! Shared test helpers for ordering integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use herald_core::clock::Clock;
use herald_demo::application::service::OrderService;
use herald_demo::application::store::InMemoryStore;
use herald_demo::boot;
use herald_dispatch::{DispatchConfig, DomainEvents};
use herald_test_support::FixedClock;

/// Fixed timestamp used across all integration tests.
pub fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// A store, the dispatcher wired to it, and the service using both.
pub struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub domain_events: DomainEvents,
    pub service: OrderService,
}

/// Builds the ordering context with `stock` units and the default
/// configuration.
pub fn fixture(stock: u32) -> Fixture {
    fixture_with_config(stock, DispatchConfig::default())
}

/// Builds the ordering context with `stock` units and `config`.
pub fn fixture_with_config(stock: u32, config: DispatchConfig) -> Fixture {
    let store = Arc::new(InMemoryStore::with_stock(stock));
    let clock = fixed_clock();
    let domain_events = boot::domain_events(&store, &clock, config).unwrap();
    let service = OrderService::new(domain_events.clone(), Arc::clone(&store), clock);
    Fixture {
        store,
        domain_events,
        service,
    }
}
