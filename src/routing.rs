//! Application router configuration with protected and unprotected route
//! definitions.

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde_json::json;

use crate::{
    AppState,
    auth::{auth_guard, log_in_endpoint, log_out_endpoint},
    endpoints,
    goal::{
        contribute_endpoint, create_goal_endpoint, delete_goal_endpoint, list_goals_endpoint,
        set_goal_progress_endpoint,
    },
    register_user::register_user_endpoint,
    scheduled::{
        advance_schedules_endpoint, create_schedule_endpoint, delete_schedule_endpoint,
        edit_schedule_endpoint, list_schedules_endpoint, set_schedule_status_endpoint,
    },
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, edit_transaction_endpoint,
        get_dashboard_endpoint, list_transactions_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::USERS, post(register_user_endpoint))
        .route(endpoints::LOG_IN, post(log_in_endpoint))
        .route(endpoints::LOG_OUT, get(log_out_endpoint));

    let protected_routes = Router::new()
        .route(
            endpoints::TRANSACTIONS,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            put(edit_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .route(endpoints::DASHBOARD, get(get_dashboard_endpoint))
        .route(
            endpoints::GOALS,
            get(list_goals_endpoint).post(create_goal_endpoint),
        )
        .route(endpoints::GOAL, delete(delete_goal_endpoint))
        .route(endpoints::GOAL_CONTRIBUTE, post(contribute_endpoint))
        .route(endpoints::GOAL_PROGRESS, put(set_goal_progress_endpoint))
        .route(
            endpoints::SCHEDULED_TRANSACTIONS,
            get(list_schedules_endpoint).post(create_schedule_endpoint),
        )
        .route(
            endpoints::SCHEDULED_TRANSACTION,
            put(edit_schedule_endpoint).delete(delete_schedule_endpoint),
        )
        .route(
            endpoints::SCHEDULED_TRANSACTION_STATUS,
            put(set_schedule_status_endpoint),
        )
        .route(
            endpoints::SCHEDULED_TRANSACTIONS_ADVANCE,
            post(advance_schedules_endpoint),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The fallback for requests that match no route.
async fn get_404_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "not found" })),
    )
        .into_response()
}

#[cfg(test)]
mod routing_tests {
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;
    use time::macros::date;

    use crate::{AppState, endpoints, routing::build_router};

    const STRONG_PASSWORD: &str = "correcthorsebatterystaple";

    fn get_test_server() -> TestServer {
        let conn = Connection::open_in_memory().unwrap();
        let state = AppState::new(conn, "42", "Etc/UTC").unwrap();
        let app = build_router(state);

        TestServer::try_new_with_config(
            app,
            axum_test::TestServerConfig {
                save_cookies: true,
                ..Default::default()
            },
        )
        .expect("Could not create test server.")
    }

    #[tokio::test]
    async fn unknown_route_returns_json_404() {
        let server = get_test_server();

        let response = server.get("/api/nope").await;

        response.assert_status_not_found();
        let body: serde_json::Value = response.json();
        assert_eq!(body["message"], "not found");
    }

    #[tokio::test]
    async fn protected_route_without_cookie_returns_401() {
        let server = get_test_server();

        server
            .get(endpoints::TRANSACTIONS)
            .await
            .assert_status_unauthorized();
    }

    #[tokio::test]
    async fn register_then_use_protected_routes() {
        let server = get_test_server();

        // Registration logs the user in via the auth cookie.
        server
            .post(endpoints::USERS)
            .json(&json!({ "email": "test@test.com", "password": STRONG_PASSWORD }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        server
            .post(endpoints::TRANSACTIONS)
            .json(&json!({
                "type": "income",
                "category": "Salary",
                "amount": 1000.0,
                "date": date!(2024 - 03 - 01),
                "description": "march pay",
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let response = server.get(endpoints::DASHBOARD).await;
        response.assert_status_ok();
        let summary: serde_json::Value = response.json();
        assert_eq!(summary["balance"], 1000.0);
    }

    #[tokio::test]
    async fn goal_contribution_round_trip() {
        let server = get_test_server();

        server
            .post(endpoints::USERS)
            .json(&json!({ "email": "test@test.com", "password": STRONG_PASSWORD }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        server
            .post(endpoints::TRANSACTIONS)
            .json(&json!({
                "type": "income",
                "category": "Salary",
                "amount": 1000.0,
                "date": date!(2024 - 03 - 01),
                "description": "march pay",
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let response = server
            .post(endpoints::GOALS)
            .json(&json!({
                "name": "Holiday",
                "type": "saving",
                "target_amount": 2000.0,
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let goal: serde_json::Value = response.json();
        let goal_id = goal["id"].as_i64().unwrap();

        let response = server
            .post(&endpoints::format_endpoint(
                endpoints::GOAL_CONTRIBUTE,
                goal_id,
            ))
            .json(&json!({ "amount": 400.0 }))
            .await;
        response.assert_status_ok();
        let contribution: serde_json::Value = response.json();
        assert_eq!(contribution["new_progress"], 400.0);

        // The contribution is drawn from the balance.
        let response = server.get(endpoints::DASHBOARD).await;
        let summary: serde_json::Value = response.json();
        assert_eq!(summary["balance"], 600.0);
    }

    #[tokio::test]
    async fn log_in_and_out() {
        let server = get_test_server();

        server
            .post(endpoints::USERS)
            .json(&json!({ "email": "test@test.com", "password": STRONG_PASSWORD }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        server.get(endpoints::LOG_OUT).await.assert_status_ok();
        server
            .get(endpoints::TRANSACTIONS)
            .await
            .assert_status_unauthorized();

        server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": "test@test.com", "password": STRONG_PASSWORD }))
            .await
            .assert_status_ok();
        server
            .get(endpoints::TRANSACTIONS)
            .await
            .assert_status_ok();
    }
}
