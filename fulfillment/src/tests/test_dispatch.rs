//! Shift and assignment engine tests

use super::*;
use crate::broker::{AVAILABLE_QUEUE, BUSY_SET, DispatchBroker, IDLE_ORDERS_QUEUE, SHIFT_SET};
use crate::dispatch::reconciler::BusyDriverReconciler;
use shared::error::ErrorCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

async fn assert_available_busy_disjoint(broker: &MemoryBroker) {
    let available = broker.queue_snapshot(AVAILABLE_QUEUE);
    let busy = broker.set_members(BUSY_SET).await.unwrap();
    for member in &available {
        assert!(
            !busy.contains(member),
            "driver {} is both available and busy",
            member
        );
    }
}

#[tokio::test]
async fn test_mark_ready_assigns_available_driver() {
    let (coordinator, store, broker, notifier) = setup();
    let mut rx = notifier.connect(DRIVER_MARCO);

    coordinator.join_shift(DRIVER_MARCO).await.unwrap();
    put_order(&store, &make_order("order-1"));

    let change = coordinator.mark_order_ready("order-1").await.unwrap();
    assert_eq!(change.order.status, OrderStatus::Ready);
    assert_eq!(change.order.driver_id, Some(DRIVER_MARCO));

    // Driver moved from available to busy
    assert!(broker.queue_snapshot(AVAILABLE_QUEUE).is_empty());
    assert!(broker
        .set_contains(BUSY_SET, &DRIVER_MARCO.to_string())
        .await
        .unwrap());
    assert_available_busy_disjoint(&broker).await;

    // Driver got the push with the cash to collect
    let notice = rx.try_recv().unwrap();
    assert_eq!(notice.order_id, "order-1");
    assert_eq!(notice.cash_due, Some(rust_decimal::Decimal::new(2250, 2)));
    assert_eq!(notice.items.len(), 2);
}

#[tokio::test]
async fn test_mark_ready_without_drivers_queues_idle() {
    let (coordinator, store, broker, _notifier) = setup();
    put_order(&store, &make_order("order-1"));

    let change = coordinator.mark_order_ready("order-1").await.unwrap();
    assert_eq!(change.order.status, OrderStatus::Ready);
    assert_eq!(change.order.driver_id, None);

    assert_eq!(broker.queue_len(IDLE_ORDERS_QUEUE).await.unwrap(), 1);
    let stored = store.get_order("order-1").unwrap().unwrap();
    assert_eq!(stored.driver_id, None);
}

#[tokio::test]
async fn test_mark_ready_rejects_assigned_order() {
    let (coordinator, store, _broker, _notifier) = setup();
    let mut order = make_order("order-1");
    order.driver_id = Some(DRIVER_MARCO);
    put_order(&store, &order);

    let err = coordinator.mark_order_ready("order-1").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::DriverAlreadyAssigned);
}

#[tokio::test]
async fn test_mark_ready_unknown_order() {
    let (coordinator, _store, _broker, _notifier) = setup();
    let err = coordinator.mark_order_ready("missing").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::OrderNotFound);
}

#[tokio::test]
async fn test_concurrent_mark_ready_single_driver() {
    let (coordinator, store, broker, _notifier) = setup();
    coordinator.join_shift(DRIVER_MARCO).await.unwrap();
    put_order(&store, &make_order("order-1"));
    put_order(&store, &make_order("order-2"));

    let (a, b) = tokio::join!(
        coordinator.mark_order_ready("order-1"),
        coordinator.mark_order_ready("order-2"),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    // Exactly one order won the driver; the other went idle
    let assigned = [&a.order, &b.order]
        .iter()
        .filter(|o| o.driver_id == Some(DRIVER_MARCO))
        .count();
    assert_eq!(assigned, 1);
    assert_eq!(broker.queue_len(IDLE_ORDERS_QUEUE).await.unwrap(), 1);
    assert_available_busy_disjoint(&broker).await;
}

#[tokio::test]
async fn test_join_shift_is_idempotent() {
    let (coordinator, _store, broker, _notifier) = setup();
    coordinator.join_shift(DRIVER_MARCO).await.unwrap();
    coordinator.join_shift(DRIVER_MARCO).await.unwrap();

    assert_eq!(
        broker.queue_snapshot(AVAILABLE_QUEUE),
        vec![DRIVER_MARCO.to_string()]
    );
    assert!(broker
        .set_contains(SHIFT_SET, &DRIVER_MARCO.to_string())
        .await
        .unwrap());
}

#[tokio::test]
async fn test_join_shift_resumes_active_delivery() {
    let (coordinator, store, broker, _notifier) = setup();

    let mut order = make_order("order-1");
    order.status = OrderStatus::OutForDelivery;
    order.driver_id = Some(DRIVER_MARCO);
    put_order(&store, &order);
    broker
        .set_add(BUSY_SET, &DRIVER_MARCO.to_string())
        .await
        .unwrap();

    let status = coordinator.join_shift(DRIVER_MARCO).await.unwrap();
    assert!(status.busy);
    assert_eq!(status.active_orders.len(), 1);
    assert_eq!(status.active_orders[0].id, "order-1");

    // Never queued as available while delivering
    assert!(broker.queue_snapshot(AVAILABLE_QUEUE).is_empty());
    assert_available_busy_disjoint(&broker).await;
}

#[tokio::test]
async fn test_join_shift_pulls_oldest_idle_order() {
    let (coordinator, store, broker, _notifier) = setup();
    put_order(&store, &make_order("order-1"));
    put_order(&store, &make_order("order-2"));
    coordinator.mark_order_ready("order-1").await.unwrap();
    coordinator.mark_order_ready("order-2").await.unwrap();

    let status = coordinator.join_shift(DRIVER_MARCO).await.unwrap();
    assert_eq!(status.active_orders.len(), 1);
    // FIFO: the oldest idle order is served first
    assert_eq!(status.active_orders[0].id, "order-1");
    assert_eq!(status.active_orders[0].driver_id, Some(DRIVER_MARCO));
    assert_eq!(broker.queue_len(IDLE_ORDERS_QUEUE).await.unwrap(), 1);

    let stored = store.get_order("order-1").unwrap().unwrap();
    assert_eq!(stored.driver_id, Some(DRIVER_MARCO));
}

#[tokio::test]
async fn test_stale_idle_entry_is_discarded() {
    let (coordinator, store, broker, _notifier) = setup();
    put_order(&store, &make_order("order-1"));
    put_order(&store, &make_order("order-2"));
    coordinator.mark_order_ready("order-1").await.unwrap();
    coordinator.mark_order_ready("order-2").await.unwrap();

    // order-1 gets cancelled while idle
    coordinator
        .lifecycle()
        .change_status(
            "order-1",
            OrderStatus::Cancelled,
            Some(shared::models::CancellationRequest::by_inventory(
                "Spoiled produce",
                None,
            )),
        )
        .await
        .unwrap();

    let status = coordinator.join_shift(DRIVER_MARCO).await.unwrap();
    assert_eq!(status.active_orders.len(), 1);
    assert_eq!(status.active_orders[0].id, "order-2");
    assert_eq!(broker.queue_len(IDLE_ORDERS_QUEUE).await.unwrap(), 0);
}

#[tokio::test]
async fn test_leave_shift_while_busy_is_rejected() {
    let (coordinator, store, broker, _notifier) = setup();
    coordinator.join_shift(DRIVER_MARCO).await.unwrap();
    put_order(&store, &make_order("order-1"));
    coordinator.mark_order_ready("order-1").await.unwrap();
    coordinator
        .take_order("order-1", DRIVER_MARCO)
        .await
        .unwrap();

    let err = coordinator.leave_shift(DRIVER_MARCO).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::DriverBusy);

    // Driver remains busy and on shift
    assert!(broker
        .set_contains(BUSY_SET, &DRIVER_MARCO.to_string())
        .await
        .unwrap());
    assert!(broker
        .set_contains(SHIFT_SET, &DRIVER_MARCO.to_string())
        .await
        .unwrap());
}

#[tokio::test]
async fn test_leave_shift_removes_available_driver() {
    let (coordinator, _store, broker, _notifier) = setup();
    coordinator.join_shift(DRIVER_MARCO).await.unwrap();
    coordinator.leave_shift(DRIVER_MARCO).await.unwrap();

    assert!(broker.queue_snapshot(AVAILABLE_QUEUE).is_empty());
    assert!(!broker
        .set_contains(SHIFT_SET, &DRIVER_MARCO.to_string())
        .await
        .unwrap());
}

#[tokio::test]
async fn test_take_order_requires_ownership_and_ready() {
    let (coordinator, store, _broker, _notifier) = setup();
    coordinator.join_shift(DRIVER_MARCO).await.unwrap();
    put_order(&store, &make_order("order-1"));
    coordinator.mark_order_ready("order-1").await.unwrap();

    let err = coordinator
        .take_order("order-1", DRIVER_LUCIA)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::OrderNotAssignedToDriver);

    let order = coordinator
        .take_order("order-1", DRIVER_MARCO)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::OutForDelivery);

    // Accepting twice is no longer possible: the order left READY
    let err = coordinator
        .take_order("order-1", DRIVER_MARCO)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidStatusTransition);
}

#[tokio::test]
async fn test_fifo_assignment_serves_oldest_driver_first() {
    let (coordinator, store, _broker, _notifier) = setup();
    coordinator.join_shift(DRIVER_MARCO).await.unwrap();
    coordinator.join_shift(DRIVER_LUCIA).await.unwrap();
    put_order(&store, &make_order("order-1"));

    let change = coordinator.mark_order_ready("order-1").await.unwrap();
    assert_eq!(change.order.driver_id, Some(DRIVER_MARCO));
}

#[tokio::test]
async fn test_driver_status_releases_stuck_busy_marker() {
    let (coordinator, _store, broker, _notifier) = setup();
    coordinator.join_shift(DRIVER_MARCO).await.unwrap();
    // Simulate the crash window: busy marker without any delivery
    broker
        .queue_remove(AVAILABLE_QUEUE, &DRIVER_MARCO.to_string())
        .await
        .unwrap();
    broker
        .set_add(BUSY_SET, &DRIVER_MARCO.to_string())
        .await
        .unwrap();

    let status = coordinator.check_driver_status(DRIVER_MARCO).await.unwrap();
    assert!(!status.busy);
    assert!(!broker
        .set_contains(BUSY_SET, &DRIVER_MARCO.to_string())
        .await
        .unwrap());
    assert_eq!(
        broker.queue_snapshot(AVAILABLE_QUEUE),
        vec![DRIVER_MARCO.to_string()]
    );
}

#[tokio::test]
async fn test_reconciler_sweep_releases_stuck_driver() {
    let (coordinator, store, broker, _notifier) = setup();
    coordinator.join_shift(DRIVER_MARCO).await.unwrap();
    broker
        .queue_remove(AVAILABLE_QUEUE, &DRIVER_MARCO.to_string())
        .await
        .unwrap();
    broker
        .set_add(BUSY_SET, &DRIVER_MARCO.to_string())
        .await
        .unwrap();

    let reconciler = BusyDriverReconciler::new(
        store.clone(),
        broker.clone(),
        coordinator.engine().clone(),
        Duration::from_millis(10),
        CancellationToken::new(),
    );
    assert_eq!(reconciler.sweep().await, 1);
    assert!(!broker
        .set_contains(BUSY_SET, &DRIVER_MARCO.to_string())
        .await
        .unwrap());

    // A genuinely busy driver is left alone
    coordinator.join_shift(DRIVER_LUCIA).await.unwrap();
    put_order(&store, &make_order("order-1"));
    coordinator.mark_order_ready("order-1").await.unwrap();
    let order = store.get_order("order-1").unwrap().unwrap();
    coordinator
        .take_order("order-1", order.driver_id.unwrap())
        .await
        .unwrap();
    assert_eq!(reconciler.sweep().await, 0);
}

#[tokio::test]
async fn test_reconciler_run_stops_on_shutdown() {
    let (coordinator, store, broker, _notifier) = setup();
    let shutdown = CancellationToken::new();
    let reconciler = BusyDriverReconciler::new(
        store,
        broker,
        coordinator.engine().clone(),
        Duration::from_millis(5),
        shutdown.clone(),
    );

    let handle = tokio::spawn(reconciler.run());
    tokio::time::sleep(Duration::from_millis(20)).await;
    shutdown.cancel();
    handle.await.unwrap();
}
