//! Defines the endpoint for manually triggering the schedule advancer.
//!
//! The background task runs the same routine on a timer; this endpoint
//! exists so a client can force a catch-up without waiting for the next
//! tick.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde_json::json;

use crate::{
    AppState, Error, scheduled::advancer::advance_due_schedules, timezone::local_date_today,
};

/// The state needed to run the advancer on demand.
#[derive(Debug, Clone)]
pub struct AdvanceSchedulesState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name.
    pub local_timezone: String,
}

impl FromRef<AppState> for AdvanceSchedulesState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// A route handler that materializes all due scheduled transactions now.
pub async fn advance_schedules_endpoint(State(state): State<AdvanceSchedulesState>) -> Response {
    let today = local_date_today(&state.local_timezone);

    let mut connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    match advance_due_schedules(today, &mut connection) {
        Ok(outcome) => Json(json!({
            "materialized": outcome.materialized,
            "completed": outcome.completed,
            "failed": outcome.failed,
        }))
        .into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod advance_schedules_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::StatusCode, response::IntoResponse};
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        PasswordHash,
        db::initialize,
        scheduled::core::{Frequency, NewSchedule, create_schedule},
        transaction::core::TransactionType,
        user::create_user,
    };

    use super::{AdvanceSchedulesState, advance_schedules_endpoint};

    #[tokio::test]
    async fn advance_endpoint_reports_outcome() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_user("test@test.com", PasswordHash::new_unchecked("hunter2"), &conn)
            .unwrap();
        // Due yesterday at the latest, whatever today is.
        create_schedule(
            user.id,
            NewSchedule {
                description: "Salary".to_string(),
                amount: 2500.0,
                transaction_type: TransactionType::Income,
                category: "Salary".to_string(),
                payment_method: "Bank-Transfer".to_string(),
                frequency: Frequency::Yearly,
                start_date: date!(2020 - 01 - 01),
                end_date: Some(date!(2020 - 01 - 01)),
            },
            &conn,
        )
        .unwrap();

        let state = AdvanceSchedulesState {
            db_connection: Arc::new(Mutex::new(conn)),
            local_timezone: "Etc/UTC".to_string(),
        };

        let response = advance_schedules_endpoint(State(state))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let outcome: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(outcome["materialized"], 1);
        assert_eq!(outcome["completed"], 1);
        assert_eq!(outcome["failed"], 0);
    }
}
