//! Goal management for the finance tracker.
//!
//! This module contains everything related to goals:
//! - The `Goal` model and database functions
//! - The contribution engine that keeps goal progress consistent with the ledger
//! - The deletion engine that refunds accumulated progress via a compensating transaction
//! - The JSON endpoints for goal CRUD, contributions and progress overwrites

mod contribute;
mod core;
mod create_endpoint;
mod delete_endpoint;
mod list_endpoint;
mod progress_endpoint;

pub use contribute::contribute_endpoint;
pub use self::core::create_goal_table;
pub use create_endpoint::create_goal_endpoint;
pub use delete_endpoint::delete_goal_endpoint;
pub use list_endpoint::list_goals_endpoint;
pub use progress_endpoint::set_goal_progress_endpoint;
