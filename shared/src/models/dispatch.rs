//! Dispatch reporting and notification payloads

use super::order::{Order, OrderItem, OrderStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Shift report returned by join-shift and driver-status queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverShiftStatus {
    pub driver_id: i64,
    pub on_shift: bool,
    pub busy: bool,
    /// The driver's READY / OUT_FOR_DELIVERY orders
    pub active_orders: Vec<Order>,
    /// Live order counts per status across the store
    pub status_counts: BTreeMap<OrderStatus, u64>,
}

/// Push payload sent to a driver when an order is assigned to them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyOrderNotice {
    pub order_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub address: String,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
    /// Cash to collect at handoff; None for prepaid orders
    pub cash_due: Option<Decimal>,
}

impl ReadyOrderNotice {
    /// Build the notice for an assigned order
    pub fn for_order(order: &Order) -> Self {
        Self {
            order_id: order.id.clone(),
            customer_name: order.customer_name.clone(),
            customer_phone: order.customer_phone.clone(),
            address: order.address.clone(),
            items: order.items.clone(),
            total: order.total,
            cash_due: order.cash_due(),
        }
    }
}
