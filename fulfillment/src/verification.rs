//! Delivery PIN verification
//!
//! A PIN is issued to the customer at checkout and only its SHA-256 hex
//! digest is stored on the order. The handoff check compares digests in
//! constant time and is rate-limited per order through an expiring broker
//! counter so a mistyped code never locks a driver out for good.

use sha2::{Digest, Sha256};
use shared::error::{AppError, AppResult, ErrorCode};
use std::time::Duration;

/// Verification attempts allowed per order within one TTL window
pub const MAX_VERIFY_ATTEMPTS: u64 = 5;

/// Window after which the per-order attempt counter expires
pub const VERIFY_ATTEMPT_TTL: Duration = Duration::from_secs(60);

/// SHA-256 hex digest of a verification code
pub fn hash_verification_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check a verification code against the stored hex digest.
///
/// Constant-time comparison; mismatch yields `Forbidden`.
pub fn verify_code(code: &str, stored_hex: &str) -> AppResult<()> {
    let expected = hex::decode(stored_hex)
        .map_err(|_| AppError::internal("Stored verification hash is not valid hex"))?;
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    let digest = hasher.finalize();

    ring::constant_time::verify_slices_are_equal(digest.as_slice(), &expected)
        .map_err(|_| AppError::new(ErrorCode::VerificationFailed))
}
