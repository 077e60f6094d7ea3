//! Busy-driver reconciliation sweeper
//!
//! The order status change commits before the driver is released, so a crash
//! between the two can leave a driver marked busy with no delivery to show
//! for it. This task periodically scans the busy set and releases any driver
//! whose out-for-delivery order no longer exists.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::broker::{BUSY_SET, DispatchBroker};
use crate::dispatch::DispatchEngine;
use crate::dispatch::notifier::DriverNotifier;
use crate::store::FulfillmentStore;
use shared::models::OrderStatus;

/// Periodic sweep releasing stuck busy markers
pub struct BusyDriverReconciler<B, N> {
    store: FulfillmentStore,
    broker: B,
    engine: DispatchEngine<B, N>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl<B, N> BusyDriverReconciler<B, N>
where
    B: DispatchBroker,
    N: DriverNotifier,
{
    pub fn new(
        store: FulfillmentStore,
        broker: B,
        engine: DispatchEngine<B, N>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            broker,
            engine,
            interval,
            shutdown,
        }
    }

    /// Main loop: sweep on an interval until shutdown
    pub async fn run(self) {
        tracing::info!("Busy driver reconciler started");
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    self.sweep().await;
                }
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Busy driver reconciler received shutdown signal");
                    return;
                }
            }
        }
    }

    /// Scan the busy set once; returns how many drivers were released
    pub async fn sweep(&self) -> usize {
        let members = match self.broker.set_members(BUSY_SET).await {
            Ok(members) => members,
            Err(e) => {
                tracing::error!("Failed to read busy set: {}", e);
                return 0;
            }
        };

        let mut released = 0;
        for member in members {
            let Ok(driver_id) = member.parse::<i64>() else {
                tracing::error!(member = %member, "Malformed driver id in busy set");
                continue;
            };

            let delivering = match self.store.orders_for_driver(driver_id) {
                Ok(orders) => orders
                    .iter()
                    .any(|o| o.status == OrderStatus::OutForDelivery),
                Err(e) => {
                    tracing::error!(driver_id, "Failed to load driver orders: {}", e);
                    continue;
                }
            };
            if delivering {
                continue;
            }

            tracing::warn!(driver_id, "Releasing driver stuck in busy set");
            match self.engine.release_driver(driver_id).await {
                Ok(()) => released += 1,
                Err(e) => tracing::error!(driver_id, "Failed to release driver: {}", e),
            }
        }

        if released > 0 {
            tracing::info!(released, "Reconciled stuck busy drivers");
        }
        released
    }
}
