//! Defines the endpoint for creating a scheduled transaction.

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
    scheduled::core::{Frequency, NewSchedule, create_schedule},
    transaction::core::{DEFAULT_PAYMENT_METHOD, TransactionType},
    user::UserId,
};

/// The state needed to create a scheduled transaction.
#[derive(Debug, Clone)]
pub struct CreateScheduleState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateScheduleState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating a scheduled transaction.
#[derive(Debug, Deserialize)]
pub struct CreateScheduleRequest {
    /// The description copied onto each occurrence.
    pub description: String,
    /// The amount of each occurrence.
    pub amount: f64,
    /// Whether occurrences are income or expenses.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The category copied onto each occurrence.
    pub category: String,
    /// The payment method copied onto each occurrence.
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
    /// How often the transaction recurs.
    pub frequency: Frequency,
    /// The date of the first occurrence.
    pub start_date: Date,
    /// The date after which no more occurrences happen.
    #[serde(default)]
    pub end_date: Option<Date>,
}

fn default_payment_method() -> String {
    DEFAULT_PAYMENT_METHOD.to_owned()
}

/// A route handler for creating a scheduled transaction.
pub async fn create_schedule_endpoint(
    State(state): State<CreateScheduleState>,
    axum::Extension(user_id): axum::Extension<UserId>,
    Json(request): Json<CreateScheduleRequest>,
) -> Response {
    let new_schedule = NewSchedule {
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

    match create_schedule(user_id, new_schedule, &connection) {
        Ok(schedule) => (StatusCode::CREATED, Json(schedule)).into_response(),
        Err(error) => error.into_response(),
    }
}
