//! FulfillmentCoordinator - use-case orchestration
//!
//! Thin layer the API handlers call. Each use case enforces its
//! pre-conditions (ownership, current status, verification) and then
//! delegates to the lifecycle state machine and the dispatch engine.

use crate::attachments::AttachmentStore;
use crate::broker::{DispatchBroker, verify_attempts_key};
use crate::dispatch::DispatchEngine;
use crate::dispatch::notifier::DriverNotifier;
use crate::lifecycle::{OrderLifecycle, StatusChange};
use crate::store::FulfillmentStore;
use crate::verification::{MAX_VERIFY_ATTEMPTS, VERIFY_ATTEMPT_TTL, verify_code};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    CancellationRequest, DriverShiftStatus, Order, OrderStatus,
};

/// Orchestrates the fulfillment use cases over the lifecycle and engine
#[derive(Clone)]
pub struct FulfillmentCoordinator<B, N, A> {
    store: FulfillmentStore,
    broker: B,
    engine: DispatchEngine<B, N>,
    lifecycle: OrderLifecycle<B, N, A>,
}

impl<B, N, A> FulfillmentCoordinator<B, N, A>
where
    B: DispatchBroker,
    N: DriverNotifier,
    A: AttachmentStore,
{
    pub fn new(store: FulfillmentStore, broker: B, notifier: N, attachments: A) -> Self {
        let engine = DispatchEngine::new(store.clone(), broker.clone(), notifier);
        let lifecycle = OrderLifecycle::new(store.clone(), engine.clone(), attachments);
        Self {
            store,
            broker,
            engine,
            lifecycle,
        }
    }

    /// The dispatch engine (shift/assignment entry points)
    pub fn engine(&self) -> &DispatchEngine<B, N> {
        &self.engine
    }

    /// The lifecycle state machine (general status changes)
    pub fn lifecycle(&self) -> &OrderLifecycle<B, N, A> {
        &self.lifecycle
    }

    /// Preparation finished: try to hand the order to a driver
    pub async fn mark_order_ready(&self, order_id: &str) -> AppResult<StatusChange> {
        self.lifecycle
            .change_status(order_id, OrderStatus::Ready, None)
            .await
    }

    /// Driver comes on duty
    pub async fn join_shift(&self, driver_id: i64) -> AppResult<DriverShiftStatus> {
        self.engine.join_shift(driver_id).await
    }

    /// Driver goes off duty
    pub async fn leave_shift(&self, driver_id: i64) -> AppResult<()> {
        self.engine.leave_shift(driver_id).await
    }

    /// Driver accepts a ready order assigned to them
    pub async fn take_order(&self, order_id: &str, driver_id: i64) -> AppResult<Order> {
        self.engine.take_order(order_id, driver_id).await
    }

    /// Driver confirms the handoff with the customer's PIN
    ///
    /// Attempts are counted per order before the code is even looked at, so
    /// hammering the endpoint with a correct code past the ceiling still
    /// yields `TooManyVerificationAttempts` until the window expires.
    pub async fn mark_order_delivered(
        &self,
        order_id: &str,
        driver_id: i64,
        verification_code: &str,
    ) -> AppResult<StatusChange> {
        let order = self
            .store
            .get_order(order_id)?
            .ok_or_else(|| AppError::order_not_found(order_id))?;
        if !order.is_assigned_to(driver_id) {
            return Err(AppError::not_assigned(order_id, driver_id));
        }
        if order.status != OrderStatus::OutForDelivery {
            return Err(AppError::invalid_transition(
                order.status.to_string(),
                OrderStatus::Delivered.to_string(),
            ));
        }
        let Some(stored_hash) = order.verification_hash.as_deref() else {
            return Err(AppError::new(ErrorCode::VerificationMissing)
                .with_detail("order_id", order_id));
        };

        let attempts = self
            .broker
            .counter_incr(&verify_attempts_key(order_id), VERIFY_ATTEMPT_TTL)
            .await?;
        if attempts > MAX_VERIFY_ATTEMPTS {
            tracing::warn!(order_id, driver_id, attempts, "Verification attempt ceiling hit");
            return Err(AppError::new(ErrorCode::TooManyVerificationAttempts)
                .with_detail("order_id", order_id));
        }

        verify_code(verification_code, stored_hash)?;

        self.lifecycle
            .change_status(order_id, OrderStatus::Delivered, None)
            .await
    }

    /// Driver aborts an active delivery
    pub async fn cancel_order_by_driver(
        &self,
        order_id: &str,
        driver_id: i64,
        reason: impl Into<String>,
    ) -> AppResult<StatusChange> {
        let order = self
            .store
            .get_order(order_id)?
            .ok_or_else(|| AppError::order_not_found(order_id))?;
        if !order.is_assigned_to(driver_id) {
            return Err(AppError::not_assigned(order_id, driver_id));
        }
        if order.status != OrderStatus::OutForDelivery {
            return Err(AppError::with_message(
                ErrorCode::InvalidStatusTransition,
                "Only an active delivery can be cancelled by its driver",
            )
            .with_detail("status", order.status.to_string()));
        }

        self.lifecycle
            .change_status(
                order_id,
                OrderStatus::Cancelled,
                Some(CancellationRequest::by_driver(reason)),
            )
            .await
    }

    /// Inventory pre-empts an order that has not begun fulfillment
    pub async fn cancel_order_by_inventory(
        &self,
        order_id: &str,
        reason: impl Into<String>,
        evidence_extension: Option<String>,
    ) -> AppResult<StatusChange> {
        let order = self
            .store
            .get_order(order_id)?
            .ok_or_else(|| AppError::order_not_found(order_id))?;
        if order.status != OrderStatus::Pending {
            return Err(AppError::with_message(
                ErrorCode::InvalidStatusTransition,
                "Inventory may only cancel orders that have not begun fulfillment",
            )
            .with_detail("status", order.status.to_string()));
        }

        self.lifecycle
            .change_status(
                order_id,
                OrderStatus::Cancelled,
                Some(CancellationRequest::by_inventory(
                    reason,
                    evidence_extension,
                )),
            )
            .await
    }

    /// Admin override: pin a driverless order to a specific driver
    pub async fn assign_order_to_driver(
        &self,
        order_id: &str,
        driver_id: i64,
    ) -> AppResult<Order> {
        let mut order = self
            .store
            .get_order(order_id)?
            .ok_or_else(|| AppError::order_not_found(order_id))?;
        if let Some(assigned) = order.driver_id {
            return Err(AppError::new(ErrorCode::DriverAlreadyAssigned)
                .with_detail("order_id", order_id)
                .with_detail("driver_id", assigned));
        }
        let staff = self
            .store
            .get_staff(driver_id)?
            .ok_or_else(|| {
                AppError::new(ErrorCode::StaffNotFound).with_detail("staff_id", driver_id)
            })?;
        if !staff.is_driver() {
            return Err(AppError::new(ErrorCode::StaffNotADriver)
                .with_detail("staff_id", driver_id));
        }

        order.driver_id = Some(driver_id);
        let txn = self.store.begin_write()?;
        self.store.put_order(&txn, &order)?;
        self.store.commit(txn)?;
        tracing::info!(order_id, driver_id, "Order manually assigned");

        if order.status == OrderStatus::Ready {
            self.engine.notify_ready(&order).await;
        }
        Ok(order)
    }

    /// Read-only driver report (with opportunistic repairs, see engine)
    pub async fn check_driver_status(&self, driver_id: i64) -> AppResult<DriverShiftStatus> {
        self.engine.driver_status(driver_id).await
    }
}
