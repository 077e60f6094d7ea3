//! End-to-end tests over the coordinator, engine, and lifecycle
//!
//! All collaborators are the real in-process implementations: in-memory
//! redb store, single-mutex broker, channel-backed notifier.

mod test_dispatch;

use crate::attachments::LocalAttachmentStore;
use crate::broker::MemoryBroker;
use crate::coordinator::FulfillmentCoordinator;
use crate::dispatch::notifier::SessionNotifier;
use crate::store::FulfillmentStore;
use rust_decimal::Decimal;
use shared::models::{
    Coupon, Customer, Order, OrderItem, OrderStatus, PaymentMethod, Product, Staff, StaffRole,
};
use shared::util::now_millis;

pub(crate) type TestCoordinator =
    FulfillmentCoordinator<MemoryBroker, SessionNotifier, LocalAttachmentStore>;

pub(crate) const CUSTOMER_PHONE: &str = "600111222";
pub(crate) const DRIVER_MARCO: i64 = 7;
pub(crate) const DRIVER_LUCIA: i64 = 8;
pub(crate) const MANAGER_SOFIA: i64 = 9;

pub(crate) fn setup() -> (
    TestCoordinator,
    FulfillmentStore,
    MemoryBroker,
    SessionNotifier,
) {
    let store = FulfillmentStore::open_in_memory().unwrap();
    let broker = MemoryBroker::new();
    let notifier = SessionNotifier::new();
    seed(&store);
    let coordinator = FulfillmentCoordinator::new(
        store.clone(),
        broker.clone(),
        notifier.clone(),
        LocalAttachmentStore::default(),
    );
    (coordinator, store, broker, notifier)
}

/// Catalog, customer, coupon, and staff rows shared by the tests
fn seed(store: &FulfillmentStore) {
    let txn = store.begin_write().unwrap();
    store
        .put_product(
            &txn,
            &Product {
                id: "prod-a".to_string(),
                name: "Tomatoes 1kg".to_string(),
                price: Decimal::new(500, 2),
                stock: 10,
            },
        )
        .unwrap();
    store
        .put_product(
            &txn,
            &Product {
                id: "prod-b".to_string(),
                name: "Olive oil 1l".to_string(),
                price: Decimal::new(1000, 2),
                stock: 5,
            },
        )
        .unwrap();
    store
        .put_customer(
            &txn,
            &Customer {
                phone: CUSTOMER_PHONE.to_string(),
                name: "Ana".to_string(),
                points: 100,
                total_spent: Decimal::ZERO,
                total_orders: 0,
                created_at: now_millis(),
                updated_at: now_millis(),
            },
        )
        .unwrap();
    store
        .put_coupon(
            &txn,
            &Coupon {
                id: "coupon-1".to_string(),
                name: "Summer".to_string(),
                value: Decimal::new(500, 2),
                remaining_uses: 4,
            },
        )
        .unwrap();
    for (id, username, role) in [
        (DRIVER_MARCO, "marco", StaffRole::Driver),
        (DRIVER_LUCIA, "lucia", StaffRole::Driver),
        (MANAGER_SOFIA, "sofia", StaffRole::Manager),
    ] {
        store
            .put_staff(
                &txn,
                &Staff {
                    id,
                    username: username.to_string(),
                    role,
                    is_active: true,
                },
            )
            .unwrap();
    }
    store.commit(txn).unwrap();
}

/// Pending order for 2× prod-a and 1× prod-b, total 22.50
pub(crate) fn make_order(order_id: &str) -> Order {
    Order {
        id: order_id.to_string(),
        customer_phone: CUSTOMER_PHONE.to_string(),
        customer_name: "Ana".to_string(),
        address: "Calle Mayor 1".to_string(),
        items: vec![
            OrderItem {
                product_id: "prod-a".to_string(),
                name: "Tomatoes 1kg".to_string(),
                quantity: 2,
                unit_price: Decimal::new(500, 2),
            },
            OrderItem {
                product_id: "prod-b".to_string(),
                name: "Olive oil 1l".to_string(),
                quantity: 1,
                unit_price: Decimal::new(1000, 2),
            },
        ],
        subtotal: Decimal::new(2000, 2),
        delivery_fee: Decimal::new(250, 2),
        total: Decimal::new(2250, 2),
        payment_method: PaymentMethod::CashOnDelivery,
        status: OrderStatus::Pending,
        driver_id: None,
        coupon_id: None,
        points_used: 0,
        points_earned: 0,
        points_discount: Decimal::ZERO,
        verification_hash: None,
        created_at: now_millis(),
        delivered_at: None,
    }
}

pub(crate) fn put_order(store: &FulfillmentStore, order: &Order) {
    let txn = store.begin_write().unwrap();
    store.put_order(&txn, order).unwrap();
    store.commit(txn).unwrap();
}
