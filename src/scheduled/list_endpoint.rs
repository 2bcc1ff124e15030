//! Defines the endpoint for listing a user's scheduled transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{AppState, Error, scheduled::core::list_schedules, user::UserId};

/// The state needed to list scheduled transactions.
#[derive(Debug, Clone)]
pub struct ListSchedulesState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListSchedulesState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for listing the authenticated user's scheduled
/// transactions.
pub async fn list_schedules_endpoint(
    State(state): State<ListSchedulesState>,
    axum::Extension(user_id): axum::Extension<UserId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    match list_schedules(user_id, &connection) {
        Ok(schedules) => Json(schedules).into_response(),
        Err(error) => error.into_response(),
    }
}
