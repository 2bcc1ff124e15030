//! Defines the endpoint for editing a scheduled transaction.

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
    database_id::ScheduleId,
    scheduled::core::{Frequency, NewSchedule, update_schedule},
    transaction::core::TransactionType,
    user::UserId,
};

/// The state needed to edit a scheduled transaction.
#[derive(Debug, Clone)]
pub struct EditScheduleState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditScheduleState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for editing a scheduled transaction.
///
/// All definition fields must be supplied; this is an overwrite, not a patch.
#[derive(Debug, Deserialize)]
pub struct EditScheduleRequest {
    /// The new description.
    pub description: String,
    /// The new amount.
    pub amount: f64,
    /// The new transaction type.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The new category.
    pub category: String,
    /// The new payment method.
    pub payment_method: String,
    /// The new frequency.
    pub frequency: Frequency,
    /// The new start date.
    pub start_date: Date,
    /// The new end date.
    #[serde(default)]
    pub end_date: Option<Date>,
}

/// A route handler for overwriting the definition of a scheduled transaction.
pub async fn edit_schedule_endpoint(
    State(state): State<EditScheduleState>,
    axum::Extension(user_id): axum::Extension<UserId>,
    Path(schedule_id): Path<ScheduleId>,
    Json(request): Json<EditScheduleRequest>,
) -> Response {
    let update = NewSchedule {
        description: request.description,
        amount: request.amount,
        transaction_type: request.transaction_type,
        category: request.category,
        payment_method: request.payment_method,
        frequency: request.frequency,
        start_date: request.start_date,
        end_date: request.end_date,
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    match update_schedule(schedule_id, user_id, update, &connection) {
        Ok(schedule) => Json(schedule).into_response(),
        Err(error) => error.into_response(),
    }
}
