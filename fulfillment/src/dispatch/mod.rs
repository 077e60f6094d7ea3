//! DispatchEngine - driver shift management and order assignment
//!
//! Coordination state lives in the dispatch broker as four primitives:
//! the `available` FIFO queue, the `busy` and `shift` sets, and the
//! `idle_orders` FIFO queue of ready orders that found no driver. Every
//! read-modify-write that must be race-free is a single compound broker
//! operation, so two concurrent calls can never hand the same driver to two
//! orders.
//!
//! The engine enforces `available ∩ busy = ∅` at every step: assignment pops
//! from `available` and marks `busy` in one move, stale queue entries are
//! discarded rather than re-queued, and shift joins never enqueue a driver
//! who is still serving a delivery.

pub mod notifier;
pub mod reconciler;

use crate::broker::{
    AVAILABLE_QUEUE, BUSY_SET, DispatchBroker, IDLE_ORDERS_QUEUE, SHIFT_SET,
};
use crate::store::FulfillmentStore;
use notifier::DriverNotifier;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{DriverShiftStatus, Order, OrderStatus, ReadyOrderNotice};

/// Driver shift and assignment engine
#[derive(Clone)]
pub struct DispatchEngine<B, N> {
    store: FulfillmentStore,
    broker: B,
    notifier: N,
}

impl<B, N> DispatchEngine<B, N>
where
    B: DispatchBroker,
    N: DriverNotifier,
{
    pub fn new(store: FulfillmentStore, broker: B, notifier: N) -> Self {
        Self {
            store,
            broker,
            notifier,
        }
    }

    /// Put a driver on duty and hand them work if any is waiting.
    ///
    /// Idempotent: rejoining mid-shift neither duplicates the queue entry
    /// nor disturbs an active delivery; the driver's current assignments are
    /// returned so an interrupted client can resume.
    pub async fn join_shift(&self, driver_id: i64) -> AppResult<DriverShiftStatus> {
        let member = driver_id.to_string();
        let enqueued = self
            .broker
            .enlist_driver(AVAILABLE_QUEUE, BUSY_SET, SHIFT_SET, &member)
            .await?;
        tracing::info!(driver_id, enqueued, "Driver joined shift");

        let mut active_orders = self.store.orders_for_driver(driver_id)?;
        if active_orders.is_empty()
            && let Some(order) = self.pull_idle_order(driver_id).await?
        {
            active_orders.push(order);
        }

        let busy = self.broker.set_contains(BUSY_SET, &member).await?;
        Ok(DriverShiftStatus {
            driver_id,
            on_shift: true,
            busy,
            active_orders,
            status_counts: self.store.status_counts()?,
        })
    }

    /// Take a driver off duty. Fails while they are serving a delivery.
    pub async fn leave_shift(&self, driver_id: i64) -> AppResult<()> {
        let member = driver_id.to_string();
        if self.broker.set_contains(BUSY_SET, &member).await? {
            return Err(AppError::with_message(
                ErrorCode::DriverBusy,
                "Finish or cancel the active delivery before leaving the shift",
            )
            .with_detail("driver_id", driver_id));
        }
        self.broker.queue_remove(AVAILABLE_QUEUE, &member).await?;
        self.broker.set_remove(SHIFT_SET, &member).await?;
        tracing::info!(driver_id, "Driver left shift");
        Ok(())
    }

    /// Mark an order ready for pickup and try to assign a driver.
    ///
    /// With a driver available the order is assigned and that driver
    /// notified; otherwise the order id joins the idle queue until a driver
    /// frees up or comes on shift.
    pub async fn mark_ready(&self, order_id: &str) -> AppResult<Order> {
        let mut order = self
            .store
            .get_order(order_id)?
            .ok_or_else(|| AppError::order_not_found(order_id))?;
        if let Some(driver_id) = order.driver_id {
            return Err(AppError::new(ErrorCode::DriverAlreadyAssigned)
                .with_detail("order_id", order_id)
                .with_detail("driver_id", driver_id));
        }

        match self.broker.pop_idle_driver(AVAILABLE_QUEUE, BUSY_SET).await? {
            Some(member) => {
                let driver_id = parse_driver_id(&member)?;
                order.driver_id = Some(driver_id);
                order.status = OrderStatus::Ready;
                let txn = self.store.begin_write()?;
                self.store.put_order(&txn, &order)?;
                self.store.commit(txn)?;

                tracing::info!(order_id, driver_id, "Ready order assigned to driver");
                self.notify_ready(&order).await;
            }
            None => {
                order.status = OrderStatus::Ready;
                let txn = self.store.begin_write()?;
                self.store.put_order(&txn, &order)?;
                self.store.commit(txn)?;

                self.broker.queue_push(IDLE_ORDERS_QUEUE, order_id).await?;
                tracing::info!(order_id, "No driver available, ready order queued idle");
            }
        }

        Ok(order)
    }

    /// Driver explicitly accepts a ready order assigned to them
    pub async fn take_order(&self, order_id: &str, driver_id: i64) -> AppResult<Order> {
        let mut order = self
            .store
            .get_order(order_id)?
            .ok_or_else(|| AppError::order_not_found(order_id))?;
        if !order.is_assigned_to(driver_id) {
            return Err(AppError::not_assigned(order_id, driver_id));
        }
        if order.status != OrderStatus::Ready {
            return Err(AppError::invalid_transition(
                order.status.to_string(),
                OrderStatus::OutForDelivery.to_string(),
            ));
        }

        self.broker
            .claim_driver(AVAILABLE_QUEUE, BUSY_SET, &driver_id.to_string())
            .await?;

        order.status = OrderStatus::OutForDelivery;
        let txn = self.store.begin_write()?;
        self.store.put_order(&txn, &order)?;
        self.store.commit(txn)?;

        tracing::info!(order_id, driver_id, "Order out for delivery");
        Ok(order)
    }

    /// Return a driver to the available pool after their delivery ended
    /// (handoff or cancellation)
    pub async fn release_driver(&self, driver_id: i64) -> AppResult<()> {
        let member = driver_id.to_string();
        self.broker.set_remove(BUSY_SET, &member).await?;
        if self.broker.set_contains(SHIFT_SET, &member).await? {
            self.broker
                .enlist_driver(AVAILABLE_QUEUE, BUSY_SET, SHIFT_SET, &member)
                .await?;
        }
        tracing::info!(driver_id, "Driver released");
        Ok(())
    }

    /// Report a driver's shift state, repairing inconsistencies on the way:
    /// a busy marker without a matching delivery is released, and an idle
    /// driver picks up the oldest waiting order.
    pub async fn driver_status(&self, driver_id: i64) -> AppResult<DriverShiftStatus> {
        let member = driver_id.to_string();
        let on_shift = self.broker.set_contains(SHIFT_SET, &member).await?;
        let mut busy = self.broker.set_contains(BUSY_SET, &member).await?;
        let mut active_orders = self.store.orders_for_driver(driver_id)?;

        if busy
            && !active_orders
                .iter()
                .any(|o| o.status == OrderStatus::OutForDelivery)
        {
            tracing::warn!(driver_id, "Busy driver has no active delivery, releasing");
            self.release_driver(driver_id).await?;
            busy = false;
        }

        if on_shift
            && !busy
            && active_orders.is_empty()
            && let Some(order) = self.pull_idle_order(driver_id).await?
        {
            active_orders.push(order);
        }

        Ok(DriverShiftStatus {
            driver_id,
            on_shift,
            busy,
            active_orders,
            status_counts: self.store.status_counts()?,
        })
    }

    /// Send the assignment notice for an order to its driver
    pub async fn notify_ready(&self, order: &Order) {
        if let Some(driver_id) = order.driver_id {
            self.notifier
                .notify(driver_id, ReadyOrderNotice::for_order(order))
                .await;
        }
    }

    /// Pop idle ready orders until one is still assignable, then assign it
    /// directly to the driver (bypassing the available-queue hand-off).
    /// Entries whose order was cancelled or assigned meanwhile are dropped.
    async fn pull_idle_order(&self, driver_id: i64) -> AppResult<Option<Order>> {
        loop {
            let Some(order_id) = self.broker.queue_pop(IDLE_ORDERS_QUEUE).await? else {
                return Ok(None);
            };
            let Some(mut order) = self.store.get_order(&order_id)? else {
                tracing::debug!(order_id = %order_id, "Idle entry for unknown order discarded");
                continue;
            };
            if order.driver_id.is_some() || order.status != OrderStatus::Ready {
                tracing::debug!(order_id = %order_id, status = %order.status, "Stale idle entry discarded");
                continue;
            }

            order.driver_id = Some(driver_id);
            let txn = self.store.begin_write()?;
            self.store.put_order(&txn, &order)?;
            self.store.commit(txn)?;

            tracing::info!(order_id = %order.id, driver_id, "Idle ready order assigned");
            return Ok(Some(order));
        }
    }
}

fn parse_driver_id(member: &str) -> AppResult<i64> {
    member
        .parse()
        .map_err(|_| AppError::broker(format!("Malformed driver id in queue: {member}")))
}
