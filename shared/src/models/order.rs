//! Order Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order fulfillment status
///
/// Statuses advance strictly forward along
/// `PENDING → PROCESSING → READY → OUT_FOR_DELIVERY → DELIVERED`;
/// `CANCELLED` is reachable from any other status (the jump from
/// `DELIVERED` is the post-delivery refund path).
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Ready,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Position along the forward chain; `Cancelled` is off-chain
    fn chain_rank(&self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Processing => Some(1),
            Self::Ready => Some(2),
            Self::OutForDelivery => Some(3),
            Self::Delivered => Some(4),
            Self::Cancelled => None,
        }
    }

    /// Whether no further forward movement is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether a transition from `self` to `target` is permitted
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        if *self == target {
            return false;
        }
        if target == Self::Cancelled {
            // Refund path: every status except CANCELLED itself may cancel
            return *self != Self::Cancelled;
        }
        match (self.chain_rank(), target.chain_rank()) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        }
    }

    /// Whether stock/coupon/points were reserved for an order in this status
    /// before delivery (it reached READY or OUT_FOR_DELIVERY)
    pub fn has_pre_delivery_reservation(&self) -> bool {
        matches!(self, Self::Ready | Self::OutForDelivery)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Ready => "READY",
            Self::OutForDelivery => "OUT_FOR_DELIVERY",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        })
    }
}

/// Payment method selected at checkout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Driver collects the order total in cash at handoff
    #[default]
    CashOnDelivery,
    /// Paid online at checkout
    Card,
}

/// Order line item
///
/// Immutable once the order is created; `unit_price` is a snapshot taken at
/// checkout and never re-read from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    /// Product reference (String ID)
    pub product_id: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub customer_phone: String,
    pub customer_name: String,
    pub address: String,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    /// Assigned delivery driver (staff ID), set by the dispatch engine
    pub driver_id: Option<i64>,
    pub coupon_id: Option<String>,
    pub points_used: i64,
    /// Loyalty points earned, computed and stamped at delivery
    pub points_earned: i64,
    pub points_discount: Decimal,
    /// SHA-256 hex of the delivery PIN issued to the customer
    pub verification_hash: Option<String>,
    pub created_at: i64,
    pub delivered_at: Option<i64>,
}

impl Order {
    /// Cash the driver must collect at handoff, if any
    pub fn cash_due(&self) -> Option<Decimal> {
        match self.payment_method {
            PaymentMethod::CashOnDelivery => Some(self.total),
            PaymentMethod::Card => None,
        }
    }

    pub fn is_assigned_to(&self, driver_id: i64) -> bool {
        self.driver_id == Some(driver_id)
    }
}
