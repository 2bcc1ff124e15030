//! Defines the endpoint for editing an existing ledger transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    database_id::TransactionId,
    transaction::core::{TransactionStatus, TransactionType, TransactionUpdate, update_transaction},
    user::UserId,
};

/// The state needed to edit a transaction.
#[derive(Debug, Clone)]
pub struct EditTransactionState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for editing a transaction.
///
/// All mutable fields must be supplied; this is an overwrite, not a patch.
#[derive(Debug, Deserialize)]
pub struct EditTransactionRequest {
    /// The new transaction type.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The new category.
    pub category: String,
    /// The new amount.
    pub amount: f64,
    /// The new date.
    pub date: Date,
    /// The new description.
    pub description: String,
    /// The new payment method.
    pub payment_method: String,
    /// The new status.
    pub status: TransactionStatus,
}

/// A route handler for overwriting the mutable fields of a transaction.
pub async fn edit_transaction_endpoint(
    State(state): State<EditTransactionState>,
    axum::Extension(user_id): axum::Extension<UserId>,
    Path(transaction_id): Path<TransactionId>,
    Json(request): Json<EditTransactionRequest>,
) -> Response {
    let update = TransactionUpdate {
        transaction_type: request.transaction_type,
        category: request.category,
        amount: request.amount,
        date: request.date,
        description: request.description,
        payment_method: request.payment_method,
        status: request.status,
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    match update_transaction(transaction_id, user_id, update, &connection) {
        Ok(transaction) => Json(transaction).into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod edit_transaction_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Json,
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        PasswordHash,
        db::initialize,
        transaction::core::{
            Transaction, TransactionStatus, TransactionType, create_transaction, get_transaction,
        },
        user::{UserId, create_user},
    };

    use super::{EditTransactionRequest, EditTransactionState, edit_transaction_endpoint};

    fn get_test_state() -> (EditTransactionState, UserId) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let user = create_user("test@test.com", PasswordHash::new_unchecked("hunter2"), &conn)
            .unwrap();

        (
            EditTransactionState {
                db_connection: Arc::new(Mutex::new(conn)),
            },
            user.id,
        )
    }

    #[tokio::test]
    async fn can_edit_transaction() {
        let (state, user_id) = get_test_state();
        let transaction = {
            let connection = state.db_connection.lock().unwrap();
            create_transaction(
                Transaction::build(
                    user_id,
                    TransactionType::Expense,
                    "Food",
                    10.0,
                    date!(2024 - 03 - 01),
                    "groceries",
                ),
                &connection,
            )
            .unwrap()
        };

        let request = EditTransactionRequest {
            transaction_type: TransactionType::Expense,
            category: "Entertainment".to_string(),
            amount: 15.0,
            date: date!(2024 - 03 - 02),
            description: "cinema".to_string(),
            payment_method: "Cash".to_string(),
            status: TransactionStatus::Completed,
        };

        let response = edit_transaction_endpoint(
            State(state.clone()),
            Extension(user_id),
            Path(transaction.id),
            Json(request),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let connection = state.db_connection.lock().unwrap();
        let updated = get_transaction(transaction.id, user_id, &connection).unwrap();
        assert_eq!(updated.category, "Entertainment");
        assert_eq!(updated.amount, 15.0);
        assert_eq!(updated.description, "cinema");
    }

    #[tokio::test]
    async fn editing_missing_transaction_returns_404() {
        let (state, user_id) = get_test_state();

        let request = EditTransactionRequest {
            transaction_type: TransactionType::Expense,
            category: "Food".to_string(),
            amount: 1.0,
            date: date!(2024 - 03 - 01),
            description: "nope".to_string(),
            payment_method: "Cash".to_string(),
            status: TransactionStatus::Completed,
        };

        let response =
            edit_transaction_endpoint(State(state), Extension(user_id), Path(999), Json(request))
                .await
                .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
