//! Defines the core data model and database queries for goals.
//!
//! A goal tracks accumulated progress against a target amount. Progress is
//! only ever increased by the contribution engine ([crate::goal::contribute])
//! and is reversed into the ledger when the goal is deleted
//! ([crate::goal::delete_endpoint]).

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, types::Type};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    database_id::GoalId,
    money::{round_to_cents, validate_amount},
    user::UserId,
};

/// What kind of target the goal tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    /// Money put aside towards a target amount.
    Saving,
    /// A target for reducing spending in some area.
    SpendingReduction,
}

impl GoalType {
    /// The string stored in the database for this goal type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Saving => "saving",
            Self::SpendingReduction => "spending_reduction",
        }
    }
}

impl FromStr for GoalType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "saving" => Ok(Self::Saving),
            "spending_reduction" => Ok(Self::SpendingReduction),
            other => Err(Error::InvalidGoalType(other.to_string())),
        }
    }
}

/// Whether the goal is still being worked towards.
///
/// A goal becomes completed exactly when its progress reaches the target
/// amount. The transition is never reversed automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    /// The goal is still accumulating progress.
    Active,
    /// The goal's progress has reached its target amount.
    Completed,
}

impl GoalStatus {
    /// The string stored in the database for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for GoalStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(Error::InvalidGoalStatus(other.to_string())),
        }
    }
}

impl Display for GoalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A savings or spending-reduction target tracked by accumulated progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// The ID of the goal.
    pub id: GoalId,
    /// The user that owns this goal.
    pub user_id: UserId,
    /// A human-readable name, e.g. "Emergency fund".
    pub name: String,
    /// What kind of target the goal tracks.
    pub goal_type: GoalType,
    /// The amount of money the user wants to reach.
    pub target_amount: f64,
    /// The amount accumulated so far. Never negative.
    pub progress: f64,
    /// When the user wants to reach the target, if they set a deadline.
    pub end_date: Option<Date>,
    /// Whether the goal is active or completed.
    pub status: GoalStatus,
    /// An optional client-defined contribution plan, stored opaquely.
    pub payment_schedule: Option<serde_json::Value>,
}

/// Compute the status a goal should have for the given progress.
///
/// Existing completion is sticky: once a goal is completed it stays completed
/// even if the target amount would no longer be met.
pub fn status_for_progress(current: GoalStatus, progress: f64, target_amount: f64) -> GoalStatus {
    if current == GoalStatus::Completed || progress >= target_amount {
        GoalStatus::Completed
    } else {
        GoalStatus::Active
    }
}

/// Create the goal table.
pub fn create_goal_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS goal (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES user(id),
                name TEXT NOT NULL,
                type TEXT NOT NULL,
                target_amount REAL NOT NULL CHECK (target_amount > 0),
                progress REAL NOT NULL DEFAULT 0 CHECK (progress >= 0),
                end_date TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                payment_schedule TEXT
                )",
        (),
    )?;

    Ok(())
}

/// Map a `rusqlite` row to a [Goal].
///
/// The column order must match the SELECT/RETURNING clauses used in this
/// module.
pub fn map_goal_row(row: &Row) -> Result<Goal, rusqlite::Error> {
    let goal_type: String = row.get(3)?;
    let goal_type = GoalType::from_str(&goal_type)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(error)))?;

    let status: String = row.get(7)?;
    let status = GoalStatus::from_str(&status)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(error)))?;

    let payment_schedule: Option<String> = row.get(8)?;
    let payment_schedule = payment_schedule
        .map(|raw| {
            serde_json::from_str(&raw).map_err(|error| {
                rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(error))
            })
        })
        .transpose()?;

    Ok(Goal {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        name: row.get(2)?,
        goal_type,
        target_amount: row.get(4)?,
        progress: row.get(5)?,
        end_date: row.get(6)?,
        status,
        payment_schedule,
    })
}

pub(crate) const GOAL_COLUMNS: &str =
    "id, user_id, name, type, target_amount, progress, end_date, status, payment_schedule";

/// The data needed to create a new goal.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGoal {
    /// A human-readable name for the goal.
    pub name: String,
    /// What kind of target the goal tracks.
    pub goal_type: GoalType,
    /// The amount of money to reach.
    pub target_amount: f64,
    /// An optional deadline.
    pub end_date: Option<Date>,
    /// Progress to start from. Defaults to zero at the HTTP layer.
    pub progress: f64,
    /// An optional client-defined contribution plan.
    pub payment_schedule: Option<serde_json::Value>,
}

/// Create a new goal owned by `user_id`.
///
/// Both the target amount and the starting progress are rounded to two
/// decimal places before they are stored. A goal created with progress
/// already at or past the target is stored as completed.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyGoalName] if the name is blank,
/// - or [Error::InvalidAmount] if the target amount is not positive or the
///   starting progress is negative,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_goal(user_id: UserId, new_goal: NewGoal, connection: &Connection) -> Result<Goal, Error> {
    if new_goal.name.trim().is_empty() {
        return Err(Error::EmptyGoalName);
    }

    validate_amount(new_goal.target_amount)?;

    if !new_goal.progress.is_finite() || new_goal.progress < 0.0 {
        return Err(Error::InvalidAmount(new_goal.progress));
    }

    let target_amount = round_to_cents(new_goal.target_amount);
    let progress = round_to_cents(new_goal.progress);
    let status = status_for_progress(GoalStatus::Active, progress, target_amount);

    let payment_schedule = new_goal
        .payment_schedule
        .as_ref()
        .map(|schedule| schedule.to_string());

    let goal = connection
        .prepare(&format!(
            "INSERT INTO goal (user_id, name, type, target_amount, progress, end_date, status, payment_schedule)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING {GOAL_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                user_id.as_i64(),
                new_goal.name.trim(),
                new_goal.goal_type.as_str(),
                target_amount,
                progress,
                new_goal.end_date,
                status.as_str(),
                payment_schedule,
            ],
            map_goal_row,
        )?;

    Ok(goal)
}

/// Retrieve the goal with `id` owned by `user_id`.
///
/// # Errors
/// This function will return an [Error::NotFound] if `id` does not refer to a
/// goal owned by `user_id`, or an [Error::SqlError] if there is some other SQL
/// error.
pub fn get_goal(id: GoalId, user_id: UserId, connection: &Connection) -> Result<Goal, Error> {
    let goal = connection
        .prepare(&format!(
            "SELECT {GOAL_COLUMNS} FROM goal WHERE id = :id AND user_id = :user_id"
        ))?
        .query_row(&[(":id", &id), (":user_id", &user_id.as_i64())], map_goal_row)?;

    Ok(goal)
}

/// Retrieve all of a user's goals, most recently created first.
///
/// # Errors
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn list_goals(user_id: UserId, connection: &Connection) -> Result<Vec<Goal>, Error> {
    let goals = connection
        .prepare(&format!(
            "SELECT {GOAL_COLUMNS} FROM goal WHERE user_id = :user_id ORDER BY id DESC"
        ))?
        .query_map(&[(":user_id", &user_id.as_i64())], map_goal_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(goals)
}

/// Overwrite the progress of the goal with `id` owned by `user_id`.
///
/// This is the administrative path behind `PUT /api/goals/{id}/progress`: it
/// performs no balance check and writes no ledger row, unlike the
/// contribution engine. The completion threshold is still applied.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if `progress` is negative or not finite,
/// - or [Error::NotFound] if `id` does not refer to a goal owned by `user_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn set_goal_progress(
    id: GoalId,
    user_id: UserId,
    progress: f64,
    connection: &Connection,
) -> Result<Goal, Error> {
    if !progress.is_finite() || progress < 0.0 {
        return Err(Error::InvalidAmount(progress));
    }

    let goal = get_goal(id, user_id, connection)?;
    let progress = round_to_cents(progress);
    let status = status_for_progress(goal.status, progress, goal.target_amount);

    let goal = connection
        .prepare(&format!(
            "UPDATE goal SET progress = ?1, status = ?2 WHERE id = ?3 AND user_id = ?4
             RETURNING {GOAL_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![progress, status.as_str(), id, user_id.as_i64()],
            map_goal_row,
        )?;

    Ok(goal)
}

#[cfg(test)]
pub(crate) fn count_goals(connection: &Connection) -> Result<i64, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM goal", [], |row| row.get(0))
        .map_err(|error| error.into())
}
