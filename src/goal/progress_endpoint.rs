//! Defines the administrative endpoint for directly overwriting a goal's
//! progress.
//!
//! Unlike the contribution engine this endpoint performs no balance check and
//! writes no ledger row. It exists for corrections; the completion threshold
//! is still applied so the goal status cannot disagree with its progress.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{AppState, Error, database_id::GoalId, goal::core::set_goal_progress, user::UserId};

/// The state needed to overwrite a goal's progress.
#[derive(Debug, Clone)]
pub struct GoalProgressState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for GoalProgressState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for overwriting a goal's progress.
#[derive(Debug, Deserialize)]
pub struct GoalProgressRequest {
    /// The new progress value.
    pub progress: f64,
}

/// A route handler for directly overwriting a goal's progress.
pub async fn set_goal_progress_endpoint(
    State(state): State<GoalProgressState>,
    axum::Extension(user_id): axum::Extension<UserId>,
    Path(goal_id): Path<GoalId>,
    Json(request): Json<GoalProgressRequest>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    match set_goal_progress(goal_id, user_id, request.progress, &connection) {
        Ok(goal) => Json(goal).into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod progress_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Json,
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use rusqlite::Connection;

    use crate::{
        PasswordHash,
        db::initialize,
        goal::core::{GoalType, NewGoal, create_goal},
        transaction::core::count_transactions,
        user::{UserId, create_user},
    };

    use super::{GoalProgressRequest, GoalProgressState, set_goal_progress_endpoint};

    fn get_test_state() -> (GoalProgressState, UserId) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let user = create_user("test@test.com", PasswordHash::new_unchecked("hunter2"), &conn)
            .unwrap();

        (
            GoalProgressState {
                db_connection: Arc::new(Mutex::new(conn)),
            },
            user.id,
        )
    }

    #[tokio::test]
    async fn overwrites_progress_without_touching_the_ledger() {
        let (state, user_id) = get_test_state();
        let goal = {
            let connection = state.db_connection.lock().unwrap();
            create_goal(
                user_id,
                NewGoal {
                    name: "Holiday".to_string(),
                    goal_type: GoalType::Saving,
                    target_amount: 500.0,
                    end_date: None,
                    progress: 0.0,
                    payment_schedule: None,
                },
                &connection,
            )
            .unwrap()
        };

        let response = set_goal_progress_endpoint(
            State(state.clone()),
            Extension(user_id),
            Path(goal.id),
            Json(GoalProgressRequest { progress: 250.0 }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let connection = state.db_connection.lock().unwrap();
        // No ledger row: this is the unguarded administrative path.
        assert_eq!(count_transactions(&connection).unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_goal_returns_404() {
        let (state, user_id) = get_test_state();

        let response = set_goal_progress_endpoint(
            State(state),
            Extension(user_id),
            Path(999),
            Json(GoalProgressRequest { progress: 1.0 }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
