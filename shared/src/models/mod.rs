//! Data models
//!
//! Shared between the fulfillment core and the API layer. Monetary fields
//! use `rust_decimal::Decimal`; timestamps are UTC milliseconds (`i64`).

pub mod cancellation;
pub mod coupon;
pub mod customer;
pub mod dispatch;
pub mod order;
pub mod product;
pub mod staff;
pub mod store_settings;
pub mod upload;

// Re-exports
pub use cancellation::*;
pub use coupon::*;
pub use customer::*;
pub use dispatch::*;
pub use order::*;
pub use product::*;
pub use staff::*;
pub use store_settings::*;
pub use upload::*;
