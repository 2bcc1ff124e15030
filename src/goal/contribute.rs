//! The contribution engine and its endpoint.
//!
//! A contribution moves money from the user's tracked balance into a goal's
//! progress. The goal read, balance check, goal write and ledger write all
//! happen inside one immediate SQL transaction so that concurrent
//! contributions to the same goal cannot lose an update and a failure cannot
//! leave the goal and the ledger disagreeing about where the money went.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error,
    database_id::GoalId,
    goal::core::{GOAL_COLUMNS, GoalStatus, get_goal, map_goal_row, status_for_progress},
    money::{round_to_cents, validate_amount},
    timezone::local_date_today,
    transaction::{
        balance::calculate_balance,
        core::{Transaction, TransactionType, create_transaction},
    },
    user::UserId,
};

/// The result of a successful contribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Contribution {
    /// The goal's progress after the contribution.
    pub new_progress: f64,
    /// Whether the contribution pushed the goal to completion (or the goal
    /// was already completed).
    pub is_completed: bool,
}

/// Contribute `amount` to the goal with `goal_id` owned by `user_id`.
///
/// A regular contribution represents money leaving the tracked budget: the
/// user's derived balance must cover `amount`, and an expense transaction
/// linked to the goal is appended to the ledger. A direct contribution
/// (`is_direct` = true) represents money that is already outside the tracked
/// budget, so it skips both the balance check and the ledger write.
///
/// The goal update and the ledger write commit atomically: either both
/// happen, or neither does.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if `amount` is not positive — nothing is written,
/// - or [Error::NotFound] if `goal_id` does not refer to a goal owned by
///   `user_id` — nothing is written,
/// - or [Error::InsufficientFunds] if a non-direct contribution exceeds the
///   user's balance — nothing is written, and the error carries the balance,
/// - or [Error::SqlError] if the store fails — the whole operation is rolled
///   back.
pub fn contribute_to_goal(
    user_id: UserId,
    goal_id: GoalId,
    amount: f64,
    is_direct: bool,
    today: Date,
    connection: &mut Connection,
) -> Result<Contribution, Error> {
    validate_amount(amount)?;

    // Immediate mode takes the write lock at BEGIN, so the progress
    // read-modify-write below cannot race another writer.
    let sql_transaction = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let goal = get_goal(goal_id, user_id, &sql_transaction)?;

    if !is_direct {
        let balance = calculate_balance(user_id, &sql_transaction)?;

        if balance < amount {
            return Err(Error::InsufficientFunds { balance });
        }
    }

    let new_progress = round_to_cents(goal.progress + amount);
    let status = status_for_progress(goal.status, new_progress, goal.target_amount);

    sql_transaction
        .prepare(&format!(
            "UPDATE goal SET progress = ?1, status = ?2 WHERE id = ?3 AND user_id = ?4
             RETURNING {GOAL_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![new_progress, status.as_str(), goal_id, user_id.as_i64()],
            map_goal_row,
        )?;

    if !is_direct {
        create_transaction(
            Transaction::build(
                user_id,
                TransactionType::Expense,
                "Other-Expense",
                amount,
                today,
                &format!("Contribution to goal: {}", goal.name),
            )
            .goal_id(Some(goal_id)),
            &sql_transaction,
        )?;
    }

    sql_transaction.commit()?;

    Ok(Contribution {
        new_progress,
        is_completed: status == GoalStatus::Completed,
    })
}

/// The state needed to contribute to a goal.
#[derive(Debug, Clone)]
pub struct ContributeState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name.
    pub local_timezone: String,
}

impl FromRef<AppState> for ContributeState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The request body for contributing to a goal.
#[derive(Debug, Deserialize)]
pub struct ContributeRequest {
    /// How much money to contribute.
    pub amount: f64,
    /// Whether the money is already outside the tracked budget.
    #[serde(default)]
    pub is_direct_contribution: bool,
}

/// A route handler for contributing to a goal.
pub async fn contribute_endpoint(
    State(state): State<ContributeState>,
    axum::Extension(user_id): axum::Extension<UserId>,
    Path(goal_id): Path<GoalId>,
    Json(request): Json<ContributeRequest>,
) -> Response {
    let today = local_date_today(&state.local_timezone);

    let mut connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    match contribute_to_goal(
        user_id,
        goal_id,
        request.amount,
        request.is_direct_contribution,
        today,
        &mut connection,
    ) {
        Ok(contribution) => (StatusCode::OK, Json(contribution)).into_response(),
        Err(error) => error.into_response(),
    }
}
