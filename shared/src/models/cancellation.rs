//! Order Cancellation Model

use serde::{Deserialize, Serialize};

/// Who triggered the cancellation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancelledBy {
    /// Driver could not complete the delivery
    Driver,
    /// Inventory pre-empted the order before fulfillment began
    Inventory,
}

/// Cancellation record, created exactly once per cancelled order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancellation {
    pub order_id: String,
    pub reason: String,
    pub cancelled_by: CancelledBy,
    /// Filename of the evidence image, if an upload ticket was issued
    pub evidence_image: Option<String>,
    pub created_at: i64,
}

/// Input for a cancellation use case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationRequest {
    pub reason: String,
    pub cancelled_by: CancelledBy,
    /// File extension of an evidence image to be uploaded (e.g. "jpg")
    pub evidence_extension: Option<String>,
}

impl CancellationRequest {
    pub fn by_driver(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            cancelled_by: CancelledBy::Driver,
            evidence_extension: None,
        }
    }

    pub fn by_inventory(reason: impl Into<String>, evidence_extension: Option<String>) -> Self {
        Self {
            reason: reason.into(),
            cancelled_by: CancelledBy::Inventory,
            evidence_extension,
        }
    }
}
