//! Defines the endpoint for listing a user's ledger transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{AppState, Error, transaction::core::list_transactions, user::UserId};

/// The state needed to list transactions.
#[derive(Debug, Clone)]
pub struct ListTransactionsState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListTransactionsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for listing the authenticated user's transactions, newest
/// first.
pub async fn list_transactions_endpoint(
    State(state): State<ListTransactionsState>,
    axum::Extension(user_id): axum::Extension<UserId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    match list_transactions(user_id, &connection) {
        Ok(transactions) => Json(transactions).into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod list_transactions_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        PasswordHash,
        db::initialize,
        transaction::core::{Transaction, TransactionType, create_transaction},
        user::create_user,
    };

    use super::{ListTransactionsState, list_transactions_endpoint};

    #[tokio::test]
    async fn lists_own_transactions() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_user("test@test.com", PasswordHash::new_unchecked("hunter2"), &conn)
            .unwrap();

        create_transaction(
            Transaction::build(
                user.id,
                TransactionType::Income,
                "Salary",
                1000.0,
                date!(2024 - 01 - 01),
                "pay",
            ),
            &conn,
        )
        .unwrap();

        let state = ListTransactionsState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response = list_transactions_endpoint(State(state), Extension(user.id))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let transactions: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(transactions.as_array().unwrap().len(), 1);
        assert_eq!(transactions[0]["description"], "pay");
    }
}
