//! Unified error codes for the Cesta backend
//!
//! This module defines all error codes shared between the fulfillment core,
//! the API layer, and clients. Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Dispatch errors
//! - 6xxx: Catalog errors
//! - 8xxx: Staff errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Auth ====================
    /// Caller is not authenticated or does not own the resource
    NotAuthenticated = 1001,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Specific role required
    RoleRequired = 2002,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order has already been delivered
    OrderAlreadyDelivered = 4002,
    /// Order has already been cancelled
    OrderAlreadyCancelled = 4003,
    /// Status transition not permitted from the current status
    InvalidStatusTransition = 4004,
    /// Order already has a driver assigned
    DriverAlreadyAssigned = 4005,
    /// Order is not assigned to the calling driver
    OrderNotAssignedToDriver = 4006,
    /// Order was never issued a delivery verification code
    VerificationMissing = 4007,
    /// Delivery verification code did not match
    VerificationFailed = 4008,
    /// Too many delivery verification attempts
    TooManyVerificationAttempts = 4009,
    /// Cancellation details are required
    CancellationDetailsRequired = 4010,

    // ==================== 5xxx: Dispatch ====================
    /// Driver is serving an active delivery
    DriverBusy = 5001,
    /// Driver is not on shift
    DriverNotOnShift = 5002,

    // ==================== 6xxx: Catalog ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Coupon not found
    CouponNotFound = 6002,
    /// Customer not found
    CustomerNotFound = 6003,

    // ==================== 8xxx: Staff ====================
    /// Staff member not found
    StaffNotFound = 8001,
    /// Staff member does not have the driver role
    StaffNotADriver = 8002,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Dispatch broker error
    BrokerError = 9003,
}

impl ErrorCode {
    /// Get the numeric value of this error code
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the default human-readable message for this error code
    pub fn message(&self) -> &'static str {
        match self {
            Self::Success => "OK",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::InvalidRequest => "Invalid request",
            Self::NotAuthenticated => "Authentication required",
            Self::PermissionDenied => "Permission denied",
            Self::RoleRequired => "Role required",
            Self::OrderNotFound => "Order not found",
            Self::OrderAlreadyDelivered => "Order has already been delivered",
            Self::OrderAlreadyCancelled => "Order has already been cancelled",
            Self::InvalidStatusTransition => "Status transition not permitted",
            Self::DriverAlreadyAssigned => "Order already has a driver assigned",
            Self::OrderNotAssignedToDriver => "Order is not assigned to this driver",
            Self::VerificationMissing => "Order has no delivery verification code",
            Self::VerificationFailed => "Verification code did not match",
            Self::TooManyVerificationAttempts => "Too many verification attempts",
            Self::CancellationDetailsRequired => "Cancellation details are required",
            Self::DriverBusy => "Driver is serving an active delivery",
            Self::DriverNotOnShift => "Driver is not on shift",
            Self::ProductNotFound => "Product not found",
            Self::CouponNotFound => "Coupon not found",
            Self::CustomerNotFound => "Customer not found",
            Self::StaffNotFound => "Staff member not found",
            Self::StaffNotADriver => "Staff member is not a driver",
            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
            Self::BrokerError => "Dispatch broker error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown u16 into an [`ErrorCode`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            0 => Self::Success,
            1 => Self::Unknown,
            2 => Self::ValidationFailed,
            3 => Self::NotFound,
            4 => Self::AlreadyExists,
            5 => Self::InvalidRequest,
            1001 => Self::NotAuthenticated,
            2001 => Self::PermissionDenied,
            2002 => Self::RoleRequired,
            4001 => Self::OrderNotFound,
            4002 => Self::OrderAlreadyDelivered,
            4003 => Self::OrderAlreadyCancelled,
            4004 => Self::InvalidStatusTransition,
            4005 => Self::DriverAlreadyAssigned,
            4006 => Self::OrderNotAssignedToDriver,
            4007 => Self::VerificationMissing,
            4008 => Self::VerificationFailed,
            4009 => Self::TooManyVerificationAttempts,
            4010 => Self::CancellationDetailsRequired,
            5001 => Self::DriverBusy,
            5002 => Self::DriverNotOnShift,
            6001 => Self::ProductNotFound,
            6002 => Self::CouponNotFound,
            6003 => Self::CustomerNotFound,
            8001 => Self::StaffNotFound,
            8002 => Self::StaffNotADriver,
            9001 => Self::InternalError,
            9002 => Self::DatabaseError,
            9003 => Self::BrokerError,
            other => return Err(InvalidErrorCode(other)),
        };
        Ok(code)
    }
}
