//! Defines the endpoint for deleting a scheduled transaction.
//!
//! Deleting a schedule only removes the template. Transactions already
//! materialized from it stay in the ledger.

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
    AppState, Error, database_id::ScheduleId, scheduled::core::delete_schedule, user::UserId,
};

/// The state needed to delete a scheduled transaction.
#[derive(Debug, Clone)]
pub struct DeleteScheduleState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteScheduleState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for deleting a scheduled transaction by its ID.
pub async fn delete_schedule_endpoint(
    State(state): State<DeleteScheduleState>,
    axum::Extension(user_id): axum::Extension<UserId>,
    Path(schedule_id): Path<ScheduleId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    match delete_schedule(schedule_id, user_id, &connection) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "scheduled transaction deleted" })),
        )
            .into_response(),
        Err(error) => error.into_response(),
    }
}
