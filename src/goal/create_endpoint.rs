//! Defines the endpoint for creating a new goal.

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
    goal::core::{GoalType, NewGoal, create_goal},
    user::UserId,
};

/// The state needed to create a goal.
#[derive(Debug, Clone)]
pub struct CreateGoalState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateGoalState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating a goal.
#[derive(Debug, Deserialize)]
pub struct CreateGoalRequest {
    /// A human-readable name for the goal.
    pub name: String,
    /// What kind of target the goal tracks.
    #[serde(rename = "type")]
    pub goal_type: GoalType,
    /// The amount of money to reach.
    pub target_amount: f64,
    /// An optional deadline.
    #[serde(default)]
    pub end_date: Option<Date>,
    /// Progress to start from, defaults to zero.
    #[serde(default)]
    pub progress: f64,
    /// An optional client-defined contribution plan, stored opaquely.
    #[serde(default)]
    pub payment_schedule: Option<serde_json::Value>,
}

/// A route handler for creating a new goal, returns the created goal as JSON.
pub async fn create_goal_endpoint(
    State(state): State<CreateGoalState>,
    axum::Extension(user_id): axum::Extension<UserId>,
    Json(request): Json<CreateGoalRequest>,
) -> Response {
    let new_goal = NewGoal {
        name: request.name,
        goal_type: request.goal_type,
        target_amount: request.target_amount,
        end_date: request.end_date,
        progress: request.progress,
        payment_schedule: request.payment_schedule,
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    match create_goal(user_id, new_goal, &connection) {
        Ok(goal) => (StatusCode::CREATED, Json(goal)).into_response(),
        Err(error) => error.into_response(),
    }
}
