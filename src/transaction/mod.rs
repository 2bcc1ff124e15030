//! Ledger transaction management for the finance tracker.
//!
//! This module contains everything related to ledger transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Database functions for storing, querying, and managing transactions
//! - The balance calculator that derives a user's balance from the ledger
//! - The JSON endpoints for transaction CRUD and the dashboard summary

pub(crate) mod balance;
pub(crate) mod core;
mod create_endpoint;
mod dashboard_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod list_endpoint;

pub use self::core::create_transaction_table;
pub use create_endpoint::create_transaction_endpoint;
pub use dashboard_endpoint::get_dashboard_endpoint;
pub use delete_endpoint::delete_transaction_endpoint;
pub use edit_endpoint::edit_transaction_endpoint;
pub use list_endpoint::list_transactions_endpoint;
