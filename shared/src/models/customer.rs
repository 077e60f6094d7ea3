//! Customer Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Customer with loyalty ledger, keyed by phone number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub phone: String,
    pub name: String,
    pub points: i64,
    pub total_spent: Decimal,
    pub total_orders: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Signed delta applied to a customer's loyalty ledger
///
/// The dispatch subsystem never overwrites ledger fields absolutely; it only
/// applies deltas, so deliver-then-cancel nets to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LedgerDelta {
    pub points: i64,
    pub total_spent: Decimal,
    pub total_orders: i64,
}

impl LedgerDelta {
    /// The delta that undoes this one exactly
    pub fn inverse(&self) -> Self {
        Self {
            points: -self.points,
            total_spent: -self.total_spent,
            total_orders: -self.total_orders,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_nets_to_zero() {
        let delta = LedgerDelta {
            points: 12,
            total_spent: Decimal::new(2250, 2),
            total_orders: 1,
        };
        let inverse = delta.inverse();
        assert_eq!(delta.points + inverse.points, 0);
        assert_eq!(delta.total_spent + inverse.total_spent, Decimal::ZERO);
        assert_eq!(delta.total_orders + inverse.total_orders, 0);
    }
}
