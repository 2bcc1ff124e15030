//! The goal deletion engine and its endpoint.
//!
//! A goal's accumulated progress is money the user set aside. Deleting the
//! goal without giving that money back would silently destroy value, and
//! since the balance is always derived from the ledger the only way to give
//! it back is a compensating income transaction. The refund and the goal
//! delete commit atomically: a deleted goal with no refund is a forbidden
//! state.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, TransactionBehavior};
use serde_json::json;
use time::Date;

use crate::{
    AppState, Error,
    database_id::GoalId,
    goal::core::get_goal,
    timezone::local_date_today,
    transaction::core::{Transaction, TransactionType, create_transaction},
    user::UserId,
};

/// Delete the goal with `goal_id` owned by `user_id`, refunding its progress.
///
/// If the goal has accumulated progress, an income transaction for exactly
/// that amount is appended to the ledger first. The refund carries no
/// `goal_id` because the goal it would reference is about to be removed.
///
/// # Errors
/// This function will return an [Error::NotFound] if `goal_id` does not refer
/// to a goal owned by `user_id` (nothing is written), or an [Error::SqlError]
/// if the store fails (the whole operation is rolled back: either the refund
/// and the delete both persist, or neither does).
pub fn delete_goal(
    user_id: UserId,
    goal_id: GoalId,
    today: Date,
    connection: &mut Connection,
) -> Result<(), Error> {
    let sql_transaction = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let goal = get_goal(goal_id, user_id, &sql_transaction)?;

    if goal.progress > 0.0 {
        create_transaction(
            Transaction::build(
                user_id,
                TransactionType::Income,
                "Other-Income",
                goal.progress,
                today,
                &format!("Refund from deleted goal: {}", goal.name),
            ),
            &sql_transaction,
        )?;
    }

    sql_transaction.execute(
        "DELETE FROM goal WHERE id = ?1 AND user_id = ?2",
        (goal_id, user_id.as_i64()),
    )?;

    sql_transaction.commit()?;

    Ok(())
}

/// The state needed to delete a goal.
#[derive(Debug, Clone)]
pub struct DeleteGoalState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name.
    pub local_timezone: String,
}

impl FromRef<AppState> for DeleteGoalState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// A route handler for deleting a goal (with refund side effect).
pub async fn delete_goal_endpoint(
    State(state): State<DeleteGoalState>,
    axum::Extension(user_id): axum::Extension<UserId>,
    Path(goal_id): Path<GoalId>,
) -> Response {
    let today = local_date_today(&state.local_timezone);

    let mut connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    match delete_goal(user_id, goal_id, today, &mut connection) {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "goal deleted" }))).into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod delete_goal_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error, PasswordHash,
        db::initialize,
        goal::{
            contribute::contribute_to_goal,
            core::{GoalType, NewGoal, count_goals, create_goal, get_goal},
        },
        transaction::{
            balance::calculate_balance,
            core::{
                Transaction, TransactionType, count_transactions, create_transaction,
                list_transactions,
            },
        },
        user::{UserId, create_user},
    };

    use super::delete_goal;

    const TODAY: time::Date = date!(2024 - 06 - 01);

    fn get_test_connection() -> (Connection, UserId) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let user = create_user("test@test.com", PasswordHash::new_unchecked("hunter2"), &conn)
            .unwrap();

        (conn, user.id)
    }

    fn create_goal_with_progress(user_id: UserId, progress: f64, conn: &mut Connection) -> i64 {
        create_transaction(
            Transaction::build(
                user_id,
                TransactionType::Income,
                "Salary",
                progress + 100.0,
                date!(2024 - 01 - 01),
                "pay",
            ),
            conn,
        )
        .unwrap();

        let goal = create_goal(
            user_id,
            NewGoal {
                name: "Holiday".to_string(),
                goal_type: GoalType::Saving,
                target_amount: 1000.0,
                end_date: None,
                progress: 0.0,
                payment_schedule: None,
            },
            conn,
        )
        .unwrap();

        if progress > 0.0 {
            contribute_to_goal(user_id, goal.id, progress, false, TODAY, conn).unwrap();
        }

        goal.id
    }

    #[test]
    fn deleting_goal_refunds_progress() {
        let (mut conn, user_id) = get_test_connection();
        let goal_id = create_goal_with_progress(user_id, 300.0, &mut conn);
        let balance_before = calculate_balance(user_id, &conn).unwrap();

        delete_goal(user_id, goal_id, TODAY, &mut conn).unwrap();

        // Refund conservation: the derived balance increases by exactly the
        // goal's progress.
        assert_eq!(
            calculate_balance(user_id, &conn).unwrap(),
            balance_before + 300.0
        );
        assert_eq!(get_goal(goal_id, user_id, &conn), Err(Error::NotFound));

        let refund = list_transactions(user_id, &conn)
            .unwrap()
            .into_iter()
            .find(|t| t.description == "Refund from deleted goal: Holiday")
            .expect("expected a refund transaction");
        assert_eq!(refund.transaction_type, TransactionType::Income);
        assert_eq!(refund.category, "Other-Income");
        assert_eq!(refund.amount, 300.0);
        // The refund must not dangle-reference the deleted goal.
        assert_eq!(refund.goal_id, None);
    }

    #[test]
    fn deleting_goal_with_zero_progress_writes_no_refund() {
        let (mut conn, user_id) = get_test_connection();
        let goal_id = create_goal_with_progress(user_id, 0.0, &mut conn);
        let transactions_before = count_transactions(&conn).unwrap();

        delete_goal(user_id, goal_id, TODAY, &mut conn).unwrap();

        assert_eq!(count_transactions(&conn).unwrap(), transactions_before);
        assert_eq!(count_goals(&conn).unwrap(), 0);
    }

    #[test]
    fn deleting_missing_goal_fails_without_mutation() {
        let (mut conn, user_id) = get_test_connection();
        let transactions_before = count_transactions(&conn).unwrap();

        assert_eq!(
            delete_goal(user_id, 999, TODAY, &mut conn),
            Err(Error::NotFound)
        );
        assert_eq!(count_transactions(&conn).unwrap(), transactions_before);
    }

    #[test]
    fn deleting_another_users_goal_fails() {
        let (mut conn, user_id) = get_test_connection();
        let goal_id = create_goal_with_progress(user_id, 100.0, &mut conn);
        let other_user = create_user(
            "other@test.com",
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap();

        assert_eq!(
            delete_goal(other_user.id, goal_id, TODAY, &mut conn),
            Err(Error::NotFound)
        );
        assert!(get_goal(goal_id, user_id, &conn).is_ok());
    }

    #[test]
    fn failed_refund_write_keeps_the_goal() {
        let (mut conn, user_id) = get_test_connection();
        let goal_id = create_goal_with_progress(user_id, 300.0, &mut conn);

        // Make the refund insert fail by swapping the ledger table for a
        // read-only view.
        conn.execute(
            "ALTER TABLE \"transaction\" RENAME TO transaction_backup",
            (),
        )
        .unwrap();
        conn.execute(
            "CREATE VIEW \"transaction\" AS SELECT * FROM transaction_backup",
            (),
        )
        .unwrap();

        let result = delete_goal(user_id, goal_id, TODAY, &mut conn);

        assert!(matches!(result, Err(Error::SqlError(_))));
        // The goal must still exist: a deleted goal with no refund is a
        // forbidden state.
        assert!(get_goal(goal_id, user_id, &conn).is_ok());
    }
}
