//! The balance calculator.
//!
//! A user's balance is never stored: it is always derived by summing the
//! ledger (income positive, expense negative). This keeps the ledger the
//! single source of truth and means compensating transactions (goal refunds)
//! are the only mechanism needed to reverse a goal's effect on the balance.

use rusqlite::Connection;

use crate::{Error, money::round_to_cents, user::UserId};

/// Compute the user's current balance from their ledger.
///
/// Returns 0.0 if the user has no transactions. Pure read, no side effects.
///
/// # Errors
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn calculate_balance(user_id: UserId, connection: &Connection) -> Result<f64, Error> {
    let balance: f64 = connection
        .prepare(
            "SELECT COALESCE(SUM(CASE WHEN type = 'income' THEN amount ELSE -amount END), 0.0)
             FROM \"transaction\"
             WHERE user_id = :user_id",
        )?
        .query_row(&[(":user_id", &user_id.as_i64())], |row| row.get(0))?;

    Ok(round_to_cents(balance))
}
