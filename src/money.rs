//! Helpers for working with monetary amounts.
//!
//! Amounts are stored as floating point numbers with two decimal places of
//! precision. Every mutation of a stored amount must round through
//! [round_to_cents] so that repeated arithmetic does not drift away from the
//! stored representation.

use crate::Error;

/// Round `amount` to two decimal places (cents).
pub fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Check that `amount` is a finite, positive monetary amount.
///
/// # Errors
///
/// Returns an [Error::InvalidAmount] if `amount` is zero, negative, NaN or
/// infinite.
pub fn validate_amount(amount: f64) -> Result<f64, Error> {
    if amount.is_finite() && amount > 0.0 {
        Ok(amount)
    } else {
        Err(Error::InvalidAmount(amount))
    }
}
