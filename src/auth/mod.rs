//! Cookie-based authentication: issuing, validating, extending and
//! invalidating the private auth cookie pair, plus the log-in and log-out
//! endpoints and the middleware that guards the rest of the API.

mod cookie;
mod log_in;
mod middleware;

pub(crate) use cookie::{DEFAULT_COOKIE_DURATION, set_auth_cookie};
pub use log_in::{log_in_endpoint, log_out_endpoint};
pub use middleware::{AuthState, auth_guard};
