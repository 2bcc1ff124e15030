//! Defines the endpoint for listing a user's goals.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{AppState, Error, goal::core::list_goals, user::UserId};

/// The state needed to list goals.
#[derive(Debug, Clone)]
pub struct ListGoalsState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListGoalsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for listing the authenticated user's goals.
pub async fn list_goals_endpoint(
    State(state): State<ListGoalsState>,
    axum::Extension(user_id): axum::Extension<UserId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    match list_goals(user_id, &connection) {
        Ok(goals) => Json(goals).into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod list_goals_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};
    use rusqlite::Connection;

    use crate::{
        PasswordHash,
        db::initialize,
        goal::core::{GoalType, NewGoal, create_goal},
        user::create_user,
    };

    use super::{ListGoalsState, list_goals_endpoint};

    #[tokio::test]
    async fn lists_only_own_goals() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_user("test@test.com", PasswordHash::new_unchecked("hunter2"), &conn)
            .unwrap();
        let other = create_user(
            "other@test.com",
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap();

        for (owner, name) in [(user.id, "Mine"), (other.id, "Theirs")] {
            create_goal(
                owner,
                NewGoal {
                    name: name.to_string(),
                    goal_type: GoalType::Saving,
                    target_amount: 100.0,
                    end_date: None,
                    progress: 0.0,
                    payment_schedule: None,
                },
                &conn,
            )
            .unwrap();
        }

        let state = ListGoalsState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response = list_goals_endpoint(State(state), Extension(user.id))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let goals: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(goals.as_array().unwrap().len(), 1);
        assert_eq!(goals[0]["name"], "Mine");
    }
}
