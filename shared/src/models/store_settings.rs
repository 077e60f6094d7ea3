//! Store Settings Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Operator-tunable store configuration (singleton record)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Currency spend required to earn one loyalty point
    pub points_per_currency_unit: Decimal,
    /// Default delivery fee applied at checkout
    pub delivery_fee: Decimal,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            points_per_currency_unit: Decimal::TEN,
            delivery_fee: Decimal::new(250, 2),
        }
    }
}
