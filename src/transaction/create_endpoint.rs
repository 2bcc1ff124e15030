//! Defines the endpoint for creating a new ledger transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    transaction::core::{
        DEFAULT_PAYMENT_METHOD, Transaction, TransactionStatus, TransactionType,
        create_transaction,
    },
    user::UserId,
};

/// The state needed to create a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating a transaction.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    /// Whether the transaction is an income or expense.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The category of the transaction.
    pub category: String,
    /// The value of the transaction in dollars. Always positive.
    pub amount: f64,
    /// The date when the transaction occurred.
    pub date: Date,
    /// Text detailing the transaction.
    pub description: String,
    /// How the money moved. Defaults to "Other".
    #[serde(default)]
    pub payment_method: Option<String>,
    /// Whether the transaction has settled. Defaults to completed.
    #[serde(default)]
    pub status: Option<TransactionStatus>,
}

/// A route handler for creating a new transaction, returns the created
/// transaction as JSON.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    axum::Extension(user_id): axum::Extension<UserId>,
    Json(request): Json<CreateTransactionRequest>,
) -> Response {
    let builder = Transaction::build(
        user_id,
        request.transaction_type,
        &request.category,
        request.amount,
        request.date,
        &request.description,
    )
    .payment_method(
        request
            .payment_method
            .as_deref()
            .unwrap_or(DEFAULT_PAYMENT_METHOD),
    )
    .status(request.status.unwrap_or(TransactionStatus::Completed));

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    match create_transaction(builder, &connection) {
        Ok(transaction) => (StatusCode::CREATED, Json(transaction)).into_response(),
        Err(error) => error.into_response(),
    }
}
