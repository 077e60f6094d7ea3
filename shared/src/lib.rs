//! Shared types for the Cesta fulfillment backend
//!
//! Common types used across crates and by the API layer: domain models,
//! the unified error system, and small utility helpers.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use serde::{Deserialize, Serialize};
