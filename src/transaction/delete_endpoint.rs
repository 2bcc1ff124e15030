//! Defines the endpoint for deleting a ledger transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde_json::json;

use crate::{
    AppState, Error, database_id::TransactionId, transaction::core::delete_transaction,
    user::UserId,
};

/// The state needed to delete a transaction.
#[derive(Debug, Clone)]
pub struct DeleteTransactionState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for deleting a transaction by its ID.
pub async fn delete_transaction_endpoint(
    State(state): State<DeleteTransactionState>,
    axum::Extension(user_id): axum::Extension<UserId>,
    Path(transaction_id): Path<TransactionId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    match delete_transaction(transaction_id, user_id, &connection) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "transaction deleted" })),
        )
            .into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod delete_transaction_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
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
            Transaction, TransactionType, count_transactions, create_transaction,
        },
        user::create_user,
    };

    use super::{DeleteTransactionState, delete_transaction_endpoint};

    #[tokio::test]
    async fn can_delete_own_transaction() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_user("test@test.com", PasswordHash::new_unchecked("hunter2"), &conn)
            .unwrap();
        let transaction = create_transaction(
            Transaction::build(
                user.id,
                TransactionType::Expense,
                "Food",
                10.0,
                date!(2024 - 03 - 01),
                "groceries",
            ),
            &conn,
        )
        .unwrap();

        let state = DeleteTransactionState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response =
            delete_transaction_endpoint(State(state.clone()), Extension(user.id), Path(transaction.id))
                .await
                .into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let connection = state.db_connection.lock().unwrap();
        assert_eq!(count_transactions(&connection).unwrap(), 0);
    }

    #[tokio::test]
    async fn deleting_missing_transaction_returns_404() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_user("test@test.com", PasswordHash::new_unchecked("hunter2"), &conn)
            .unwrap();

        let state = DeleteTransactionState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response = delete_transaction_endpoint(State(state), Extension(user.id), Path(999))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
