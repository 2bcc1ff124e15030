//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/goals/{goal_id}', use
//! [format_endpoint].

/// The route for registering a new user.
pub const USERS: &str = "/api/users";
/// The route for logging in a user.
pub const LOG_IN: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";

/// The route to access transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to access a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route for the dashboard summary.
pub const DASHBOARD: &str = "/api/transactions/dashboard";

/// The route to access goals.
pub const GOALS: &str = "/api/goals";
/// The route to access a single goal.
pub const GOAL: &str = "/api/goals/{goal_id}";
/// The route to contribute money to a goal.
pub const GOAL_CONTRIBUTE: &str = "/api/goals/{goal_id}/contribute";
/// The route to overwrite a goal's progress.
pub const GOAL_PROGRESS: &str = "/api/goals/{goal_id}/progress";

/// The route to access scheduled transactions.
pub const SCHEDULED_TRANSACTIONS: &str = "/api/scheduled_transactions";
/// The route to access a single scheduled transaction.
pub const SCHEDULED_TRANSACTION: &str = "/api/scheduled_transactions/{schedule_id}";
/// The route to pause or resume a scheduled transaction.
pub const SCHEDULED_TRANSACTION_STATUS: &str = "/api/scheduled_transactions/{schedule_id}/status";
/// The route to materialize all due scheduled transactions now.
pub const SCHEDULED_TRANSACTIONS_ADVANCE: &str = "/api/scheduled_transactions/advance";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/goals/{goal_id}', '{goal_id}' is
/// the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
