//! OrderLifecycle - status state machine with compensating side effects
//!
//! # Transition Flow
//!
//! ```text
//! change_status(order_id, target)
//!     ├─ 1. Load order (NotFound if absent)
//!     ├─ 2. No-op when target == current
//!     ├─ 3. Reject transitions that are not forward-or-cancel
//!     ├─ 4. READY      → dispatch engine assignment (driver or idle queue)
//!     │    DELIVERED  → ledger + stock + timestamps in one transaction
//!     │    CANCELLED  → compensation plan + cancellation record
//!     │    otherwise  → plain forward status update
//!     └─ 5. Release the driver after a commit that ends OUT_FOR_DELIVERY
//! ```
//!
//! Compensation, ledger, and stock writes share one store transaction with
//! the status update; a failed step aborts the whole transition.

use crate::attachments::{AttachmentStore, EVIDENCE_TICKET_TTL};
use crate::broker::DispatchBroker;
use crate::dispatch::DispatchEngine;
use crate::dispatch::notifier::DriverNotifier;
use crate::store::FulfillmentStore;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    CancellationRequest, LedgerDelta, Order, OrderCancellation, OrderStatus, StockDelta,
    UploadTicket,
};
use shared::util::now_millis;

/// Result of a status transition
#[derive(Debug, Clone, serde::Serialize)]
pub struct StatusChange {
    pub order: Order,
    /// Present when the transition cancelled the order
    pub cancellation: Option<OrderCancellation>,
    /// Present when cancellation evidence was requested
    pub evidence_upload: Option<UploadTicket>,
}

impl StatusChange {
    fn of(order: Order) -> Self {
        Self {
            order,
            cancellation: None,
            evidence_upload: None,
        }
    }
}

/// How far an order got before cancellation, driving which reversal runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompensationPlan {
    /// PENDING / PROCESSING: nothing reserved, nothing to undo
    NotYetReserved,
    /// READY / OUT_FOR_DELIVERY: stock, coupon use, and spent points are
    /// held for this order and must be given back
    ReservedPreDelivery,
    /// DELIVERED: refund path; the delivery ledger delta is negated exactly,
    /// stock stays deducted (goods already shipped)
    DeliveredReversal,
}

impl CompensationPlan {
    pub fn for_status(status: OrderStatus) -> Self {
        if status == OrderStatus::Delivered {
            Self::DeliveredReversal
        } else if status.has_pre_delivery_reservation() {
            Self::ReservedPreDelivery
        } else {
            Self::NotYetReserved
        }
    }
}

/// Status state machine over the fulfillment store
#[derive(Clone)]
pub struct OrderLifecycle<B, N, A> {
    store: FulfillmentStore,
    engine: DispatchEngine<B, N>,
    attachments: A,
}

impl<B, N, A> OrderLifecycle<B, N, A>
where
    B: DispatchBroker,
    N: DriverNotifier,
    A: AttachmentStore,
{
    pub fn new(store: FulfillmentStore, engine: DispatchEngine<B, N>, attachments: A) -> Self {
        Self {
            store,
            engine,
            attachments,
        }
    }

    /// Move an order to `target`, applying the side effects of the
    /// transition. Calling with the order's current status is a no-op.
    pub async fn change_status(
        &self,
        order_id: &str,
        target: OrderStatus,
        cancellation: Option<CancellationRequest>,
    ) -> AppResult<StatusChange> {
        let order = self
            .store
            .get_order(order_id)?
            .ok_or_else(|| AppError::order_not_found(order_id))?;

        if order.status == target {
            return Ok(StatusChange::of(order));
        }
        if !order.status.can_transition_to(target) {
            return Err(AppError::invalid_transition(
                order.status.to_string(),
                target.to_string(),
            ));
        }

        match target {
            OrderStatus::Ready => {
                let order = self.engine.mark_ready(order_id).await?;
                Ok(StatusChange::of(order))
            }
            OrderStatus::Delivered => self.deliver(order).await,
            OrderStatus::Cancelled => self.cancel(order, cancellation).await,
            _ => self.advance(order, target),
        }
    }

    /// Plain forward status update with no side effects (e.g. PROCESSING)
    fn advance(&self, mut order: Order, target: OrderStatus) -> AppResult<StatusChange> {
        order.status = target;
        let txn = self.store.begin_write()?;
        self.store.put_order(&txn, &order)?;
        self.store.commit(txn)?;
        tracing::info!(order_id = %order.id, status = %target, "Order status advanced");
        Ok(StatusChange::of(order))
    }

    /// Handoff completed: award points, book the sale, deduct stock
    async fn deliver(&self, mut order: Order) -> AppResult<StatusChange> {
        let previous = order.status;
        let settings = self.store.settings()?;
        let points_earned = earned_points(
            order.total,
            order.points_discount,
            settings.points_per_currency_unit,
        );

        let delta = LedgerDelta {
            points: points_earned - order.points_used,
            total_spent: order.total,
            total_orders: 1,
        };
        let stock: Vec<StockDelta> = order
            .items
            .iter()
            .map(|item| StockDelta {
                product_id: item.product_id.clone(),
                delta: -item.quantity,
            })
            .collect();

        let txn = self.store.begin_write()?;
        self.store
            .apply_ledger_delta(&txn, &order.customer_phone, &delta)?;
        self.store.adjust_stock(&txn, &stock)?;
        order.points_earned = points_earned;
        order.status = OrderStatus::Delivered;
        order.delivered_at = Some(now_millis());
        self.store.put_order(&txn, &order)?;
        self.store.commit(txn)?;

        tracing::info!(
            order_id = %order.id,
            points_earned,
            "Order delivered"
        );

        if previous == OrderStatus::OutForDelivery
            && let Some(driver_id) = order.driver_id
        {
            self.engine.release_driver(driver_id).await?;
        }

        Ok(StatusChange::of(order))
    }

    /// Cancel the order, undoing exactly the side effects already applied
    async fn cancel(
        &self,
        mut order: Order,
        cancellation: Option<CancellationRequest>,
    ) -> AppResult<StatusChange> {
        let Some(request) = cancellation else {
            return Err(AppError::new(ErrorCode::CancellationDetailsRequired)
                .with_detail("order_id", order.id.clone()));
        };
        if request.reason.trim().is_empty() {
            return Err(
                AppError::validation("Cancellation reason must not be empty")
                    .with_detail("field", "reason"),
            );
        }

        let previous = order.status;
        let plan = CompensationPlan::for_status(previous);

        let evidence_upload = match &request.evidence_extension {
            Some(ext) => Some(
                self.attachments
                    .issue_upload_ticket(EVIDENCE_TICKET_TTL, ext)
                    .await?,
            ),
            None => None,
        };

        let record = OrderCancellation {
            order_id: order.id.clone(),
            reason: request.reason.clone(),
            cancelled_by: request.cancelled_by,
            evidence_image: evidence_upload.as_ref().map(|t| t.filename.clone()),
            created_at: now_millis(),
        };

        let txn = self.store.begin_write()?;
        match plan {
            CompensationPlan::NotYetReserved => {}
            CompensationPlan::ReservedPreDelivery => {
                let stock: Vec<StockDelta> = order
                    .items
                    .iter()
                    .map(|item| StockDelta {
                        product_id: item.product_id.clone(),
                        delta: item.quantity,
                    })
                    .collect();
                self.store.adjust_stock(&txn, &stock)?;
                if let Some(coupon_id) = &order.coupon_id {
                    self.store.adjust_coupon_uses(&txn, coupon_id, 1)?;
                }
                if order.points_used != 0 {
                    let refund = LedgerDelta {
                        points: order.points_used,
                        total_spent: Decimal::ZERO,
                        total_orders: 0,
                    };
                    self.store
                        .apply_ledger_delta(&txn, &order.customer_phone, &refund)?;
                }
            }
            CompensationPlan::DeliveredReversal => {
                let delivery_delta = LedgerDelta {
                    points: order.points_earned - order.points_used,
                    total_spent: order.total,
                    total_orders: 1,
                };
                self.store.apply_ledger_delta(
                    &txn,
                    &order.customer_phone,
                    &delivery_delta.inverse(),
                )?;
            }
        }
        self.store.save_cancellation(&txn, &record)?;
        if let Some(ticket) = &evidence_upload {
            self.store
                .index_upload_ticket(&txn, &ticket.filename, &order.id)?;
        }
        order.status = OrderStatus::Cancelled;
        self.store.put_order(&txn, &order)?;
        self.store.commit(txn)?;

        tracing::info!(
            order_id = %order.id,
            from = %previous,
            plan = ?plan,
            "Order cancelled"
        );

        if previous == OrderStatus::OutForDelivery
            && let Some(driver_id) = order.driver_id
        {
            self.engine.release_driver(driver_id).await?;
        }

        Ok(StatusChange {
            order,
            cancellation: Some(record),
            evidence_upload,
        })
    }
}

/// Points earned for a delivered order at the configured earn rate
fn earned_points(total: Decimal, points_discount: Decimal, per_unit: Decimal) -> i64 {
    if per_unit <= Decimal::ZERO {
        return 0;
    }
    ((total - points_discount) / per_unit)
        .floor()
        .to_i64()
        .unwrap_or(0)
        .max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_earned_points_floors() {
        // 22.50 spend at 10 per point → 2 points
        assert_eq!(
            earned_points(Decimal::new(2250, 2), Decimal::ZERO, Decimal::TEN),
            2
        );
        // Discounted portion earns nothing
        assert_eq!(
            earned_points(Decimal::new(2250, 2), Decimal::new(500, 2), Decimal::TEN),
            1
        );
    }

    #[test]
    fn test_earned_points_never_negative() {
        assert_eq!(
            earned_points(Decimal::new(100, 2), Decimal::new(500, 2), Decimal::TEN),
            0
        );
        assert_eq!(
            earned_points(Decimal::new(2250, 2), Decimal::ZERO, Decimal::ZERO),
            0
        );
    }

    #[test]
    fn test_compensation_plan_selection() {
        assert_eq!(
            CompensationPlan::for_status(OrderStatus::Pending),
            CompensationPlan::NotYetReserved
        );
        assert_eq!(
            CompensationPlan::for_status(OrderStatus::Processing),
            CompensationPlan::NotYetReserved
        );
        assert_eq!(
            CompensationPlan::for_status(OrderStatus::Ready),
            CompensationPlan::ReservedPreDelivery
        );
        assert_eq!(
            CompensationPlan::for_status(OrderStatus::OutForDelivery),
            CompensationPlan::ReservedPreDelivery
        );
        assert_eq!(
            CompensationPlan::for_status(OrderStatus::Delivered),
            CompensationPlan::DeliveredReversal
        );
    }
}
