//! Defines the endpoint for registering a new user account.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;
use time::Duration;

use crate::{
    AppState, Error, PasswordHash,
    auth::set_auth_cookie,
    user::create_user,
};

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<RegistrationState> for Key {
    fn from_ref(state: &RegistrationState) -> Self {
        state.cookie_key.clone()
    }
}

/// The request body for registering a new user.
#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    /// The email to register with. Must not already be registered.
    pub email: String,
    /// The password for the new account. Checked for guessability before
    /// being accepted.
    pub password: String,
}

/// A route handler for creating a new user.
///
/// The new user is logged in immediately: the response carries the auth
/// cookie pair alongside the created user.
pub async fn register_user_endpoint(
    State(state): State<RegistrationState>,
    jar: PrivateCookieJar,
    Json(request): Json<RegisterUserRequest>,
) -> Response {
    let password_hash =
        match PasswordHash::from_raw_password(&request.password, PasswordHash::DEFAULT_COST) {
        Ok(password_hash) => password_hash,
        Err(error) => return error.into_response(),
    };

    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(_) => return Error::DatabaseLockError.into_response(),
        };

        match create_user(&request.email, password_hash, &connection) {
            Ok(user) => user,
            Err(error) => return error.into_response(),
        }
    };

    let jar = match set_auth_cookie(jar, user.id, state.cookie_duration) {
        Ok(jar) => jar,
        Err(error) => return error.into_response(),
    };

    (
        StatusCode::CREATED,
        jar,
        Json(json!({ "id": user.id.as_i64(), "email": user.email })),
    )
        .into_response()
}
