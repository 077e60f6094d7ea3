//! Coupon Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Discount coupon
///
/// `remaining_uses` is decremented when an order applies the coupon and
/// incremented back only by a compensating cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub id: String,
    pub name: String,
    pub value: Decimal,
    pub remaining_uses: i32,
}
