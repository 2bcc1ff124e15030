//! Fintrack is a personal finance tracker: a JSON REST API for recording
//! income and expenses, saving towards goals, and automating recurring
//! transactions.
//!
//! The library wires together a SQLite-backed ledger, a goal store whose
//! progress is kept consistent with the ledger under concurrent writes, and a
//! scheduled-transaction advancer that materializes recurring entries.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod app_state;
mod auth;
mod database_id;
mod db;
mod endpoints;
mod goal;
mod logging;
mod money;
mod password;
mod register_user;
mod routing;
mod scheduled;
mod timezone;
mod transaction;
mod user;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use logging::logging_middleware;
pub use password::{PasswordHash, ValidatedPassword};
pub use routing::build_router;
pub use scheduled::start_advancer_task;
pub use user::{User, UserId, create_user};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an invalid email/password combination.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Either the user ID or expiry cookie is missing from the cookie jar in
    /// the request.
    #[error("no cookies in the cookie jar :(")]
    CookieMissing,

    /// There was an error parsing the date in the cookie or creating the new
    /// expiry date time.
    ///
    /// Callers should pass in the original error as a string and the date
    /// string that caused the error.
    #[error("could not format expiry cookie date-time string \"{1}\": {0}")]
    InvalidDateFormat(String, String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The email address used to register already belongs to a user.
    #[error("the email address is already registered")]
    DuplicateEmail,

    /// A transaction, goal or scheduled transaction amount was zero, negative
    /// or not a finite number.
    #[error("{0} is not a valid amount, amounts must be positive")]
    InvalidAmount(f64),

    /// The category does not belong to the list of valid categories for the
    /// transaction type.
    #[error("\"{0}\" is not a valid category for the transaction type")]
    InvalidCategory(String),

    /// The string could not be parsed as a transaction type.
    #[error("\"{0}\" is not a valid transaction type")]
    InvalidTransactionType(String),

    /// The string could not be parsed as a transaction status.
    #[error("\"{0}\" is not a valid transaction status")]
    InvalidTransactionStatus(String),

    /// The string could not be parsed as a goal type.
    #[error("\"{0}\" is not a valid goal type")]
    InvalidGoalType(String),

    /// The string could not be parsed as a goal status.
    #[error("\"{0}\" is not a valid goal status")]
    InvalidGoalStatus(String),

    /// The string could not be parsed as a recurrence frequency.
    #[error("\"{0}\" is not a valid frequency")]
    InvalidFrequency(String),

    /// The string could not be parsed as a scheduled transaction status.
    #[error("\"{0}\" is not a valid schedule status")]
    InvalidScheduleStatus(String),

    /// An empty string was used to create a goal name.
    #[error("goal name cannot be empty")]
    EmptyGoalName,

    /// The user tried to contribute more money to a goal than their current
    /// balance allows.
    ///
    /// Carries the derived balance so the client can show the user how much
    /// they actually have available.
    #[error("insufficient funds: the current balance is {balance}")]
    InsufficientFunds {
        /// The user's derived balance at the time of the failed contribution.
        balance: f64,
    },

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self {
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::InvalidCredentials | Error::CookieMissing | Error::InvalidDateFormat(_, _) => {
                StatusCode::UNAUTHORIZED
            }
            Error::DuplicateEmail => StatusCode::CONFLICT,
            Error::TooWeak(_)
            | Error::InvalidAmount(_)
            | Error::InvalidCategory(_)
            | Error::InvalidTransactionType(_)
            | Error::InvalidTransactionStatus(_)
            | Error::InvalidGoalType(_)
            | Error::InvalidGoalStatus(_)
            | Error::InvalidFrequency(_)
            | Error::InvalidScheduleStatus(_)
            | Error::EmptyGoalName
            | Error::InsufficientFunds { .. } => StatusCode::BAD_REQUEST,
            Error::HashingError(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError
            | Error::InvalidTimezoneError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Internal errors must not leak details such as SQL messages to the
        // client.
        let body = match self {
            Error::InsufficientFunds { balance } => {
                json!({ "message": self.to_string(), "balance": balance })
            }
            _ if status == StatusCode::INTERNAL_SERVER_ERROR => {
                json!({ "message": "internal server error" })
            }
            _ => json!({ "message": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
