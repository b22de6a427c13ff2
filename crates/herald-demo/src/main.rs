//! Herald demo entry point: boots the dispatcher and runs a few orders
//! through it.

use std::sync::Arc;

use herald_core::CancellationToken;
use herald_core::clock::{Clock, SystemClock};
use herald_demo::application::store::InMemoryStore;
use herald_demo::boot;
use herald_demo::error::AppError;
use herald_dispatch::DispatchConfig;
use tracing_subscriber::EnvFilter;

/// Units of stock the demo starts with.
const INITIAL_STOCK: u32 = 3;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Read configuration from environment.
    let config = DispatchConfig::from_env()?;
    tracing::info!(
        drain_policy = %config.drain_policy,
        warn_on_unhandled = config.warn_on_unhandled,
        "starting Herald demo"
    );

    let store = Arc::new(InMemoryStore::with_stock(INITIAL_STOCK));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let service = boot::order_service(Arc::clone(&store), clock, config)?;

    // Ctrl-C cancels whatever unit of work is in flight.
    let cancellation = CancellationToken::new();
    let on_interrupt = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let order_id = service.place_order("ada", 2, 1_250, &cancellation).await?;
    service.pay_order(order_id, 2_500, &cancellation).await?;
    service.ship_order(order_id, "parcel-co", &cancellation).await?;

    // Only one unit is left, so the stock reservation handler rejects this
    // order and the whole unit of work rolls back.
    if let Err(error) = service.place_order("grace", 2, 900, &cancellation).await {
        tracing::warn!(error = %error, "order rejected");
    }

    let state = store.snapshot();
    tracing::info!(
        orders = state.orders.len(),
        stock = state.stock,
        notifications = state.notifications.len(),
        audit_entries = state.audit.len(),
        "demo finished"
    );
    Ok(())
}
