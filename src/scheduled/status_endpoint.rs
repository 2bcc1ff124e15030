//! Defines the endpoint for pausing and resuming a scheduled transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    database_id::ScheduleId,
    scheduled::core::{ScheduleStatus, set_schedule_status},
    user::UserId,
};

/// The state needed to change a schedule's status.
#[derive(Debug, Clone)]
pub struct ScheduleStatusState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ScheduleStatusState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for changing a schedule's status.
#[derive(Debug, Deserialize)]
pub struct ScheduleStatusRequest {
    /// The status to switch to.
    pub status: ScheduleStatus,
}

/// A route handler for pausing or resuming a scheduled transaction.
///
/// The completed status is reserved for the advancer; clients can only
/// switch between active and paused.
pub async fn set_schedule_status_endpoint(
    State(state): State<ScheduleStatusState>,
    axum::Extension(user_id): axum::Extension<UserId>,
    Path(schedule_id): Path<ScheduleId>,
    Json(request): Json<ScheduleStatusRequest>,
) -> Response {
    if request.status == ScheduleStatus::Completed {
        return Error::InvalidScheduleStatus("completed".to_string()).into_response();
    }

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    match set_schedule_status(schedule_id, user_id, request.status, &connection) {
        Ok(schedule) => Json(schedule).into_response(),
        Err(error) => error.into_response(),
    }
}
