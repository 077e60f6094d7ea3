//! Product Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product entity (stock-bearing subset used by fulfillment)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
}

/// Signed stock adjustment for a single product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockDelta {
    pub product_id: String,
    pub delta: i32,
}
