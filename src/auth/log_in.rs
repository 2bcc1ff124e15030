//! Defines the endpoints for logging in and out.
//!
//! The cookie module handles the lower level cookie auth logic.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;
use time::Duration;

use crate::{
    AppState, Error,
    auth::cookie::{invalidate_auth_cookie, set_auth_cookie},
    user::get_user_by_email,
};

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LogInState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LogInState> for Key {
    fn from_ref(state: &LogInState) -> Self {
        state.cookie_key.clone()
    }
}

/// The request body for logging in.
#[derive(Debug, Deserialize)]
pub struct LogInRequest {
    /// The email the user registered with.
    pub email: String,
    /// The user's password.
    pub password: String,
}

/// A route handler for logging in.
///
/// A failed login does not distinguish between an unknown email and a wrong
/// password; both produce the same 401 response.
pub async fn log_in_endpoint(
    State(state): State<LogInState>,
    jar: PrivateCookieJar,
    Json(request): Json<LogInRequest>,
) -> Response {
    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(_) => return Error::DatabaseLockError.into_response(),
        };

        match get_user_by_email(&request.email, &connection) {
            Ok(user) => user,
            Err(Error::NotFound) => return Error::InvalidCredentials.into_response(),
            Err(error) => return error.into_response(),
        }
    };

    match user.password_hash.verify(&request.password) {
        Ok(true) => {}
        Ok(false) => return Error::InvalidCredentials.into_response(),
        Err(error) => return Error::HashingError(error.to_string()).into_response(),
    }

    let jar = match set_auth_cookie(jar, user.id, state.cookie_duration) {
        Ok(jar) => jar,
        Err(error) => return error.into_response(),
    };

    (
        jar,
        Json(json!({ "id": user.id.as_i64(), "email": user.email })),
    )
        .into_response()
}

/// A route handler for logging out.
///
/// Always succeeds, even when no one was logged in.
pub async fn log_out_endpoint(jar: PrivateCookieJar) -> Response {
    (
        invalidate_auth_cookie(jar),
        Json(json!({ "message": "logged out" })),
    )
        .into_response()
}

#[cfg(test)]
mod log_in_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, extract::State, response::IntoResponse};
    use axum_extra::extract::{PrivateCookieJar, cookie::Key};
    use rusqlite::Connection;
    use sha2::{Digest, Sha512};

    use crate::{
        PasswordHash,
        auth::cookie::{COOKIE_USER_ID, DEFAULT_COOKIE_DURATION, extract_user_id},
        db::initialize,
        user::create_user,
    };

    use super::{LogInRequest, LogInState, log_in_endpoint, log_out_endpoint};

    const TEST_PASSWORD: &str = "correcthorsebatterystaple";

    fn get_test_state() -> LogInState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let hash = bcrypt::hash(TEST_PASSWORD, 4).unwrap();
        create_user("test@test.com", PasswordHash::new_unchecked(&hash), &conn).unwrap();

        LogInState {
            cookie_key: Key::from(&Sha512::digest("foobar")),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    fn get_jar(state: &LogInState) -> PrivateCookieJar {
        PrivateCookieJar::new(state.cookie_key.clone())
    }

    #[tokio::test]
    async fn log_in_with_valid_credentials_sets_auth_cookie() {
        let state = get_test_state();
        let jar = get_jar(&state);

        let response = log_in_endpoint(
            State(state.clone()),
            jar,
            Json(LogInRequest {
                email: "test@test.com".to_string(),
                password: TEST_PASSWORD.to_string(),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), axum::http::StatusCode::OK);

        // The private jar must be able to decrypt the cookie back out of the
        // response headers.
        let set_cookie = response
            .headers()
            .get_all(axum::http::header::SET_COOKIE)
            .iter()
            .map(|value| value.to_str().unwrap().to_string())
            .collect::<Vec<_>>();
        assert!(
            set_cookie
                .iter()
                .any(|header| header.starts_with(COOKIE_USER_ID)),
            "expected a user_id cookie in {set_cookie:?}"
        );
    }

    #[tokio::test]
    async fn log_in_with_wrong_password_returns_401() {
        let state = get_test_state();
        let jar = get_jar(&state);

        let response = log_in_endpoint(
            State(state),
            jar,
            Json(LogInRequest {
                email: "test@test.com".to_string(),
                password: "wrong password".to_string(),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn log_in_with_unknown_email_returns_401() {
        let state = get_test_state();
        let jar = get_jar(&state);

        let response = log_in_endpoint(
            State(state),
            jar,
            Json(LogInRequest {
                email: "nobody@test.com".to_string(),
                password: TEST_PASSWORD.to_string(),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn log_out_invalidates_cookie() {
        let state = get_test_state();
        let jar = crate::auth::cookie::set_auth_cookie(
            get_jar(&state),
            crate::user::UserId::new(1),
            DEFAULT_COOKIE_DURATION,
        )
        .unwrap();

        let _ = extract_user_id(&jar.get(COOKIE_USER_ID).unwrap()).unwrap();

        let response = log_out_endpoint(jar).await.into_response();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
