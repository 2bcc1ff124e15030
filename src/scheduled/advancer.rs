//! Materializes due scheduled transactions into the ledger.
//!
//! Each due schedule is handled in its own database transaction: the ledger
//! row is inserted and the schedule's bookkeeping (`last_execution`,
//! `next_execution`, possibly `status`) is updated atomically, so a crash
//! mid-run never produces a ledger entry without the matching date advance or
//! vice versa. Failures on one schedule are logged and do not stop the rest
//! of the run.

use std::time::Duration as StdDuration;

use rusqlite::{Connection, TransactionBehavior};
use time::Date;

use crate::{
    AppState, Error,
    scheduled::core::{
        SCHEDULE_COLUMNS, ScheduleStatus, ScheduledTransaction, advance_date, map_schedule_row,
    },
    timezone::local_date_today,
    transaction::core::{Transaction, create_transaction},
};

/// How often the background advancer wakes up.
const ADVANCER_INTERVAL: StdDuration = StdDuration::from_secs(60 * 60);

/// The tallies from one advancer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdvanceOutcome {
    /// The number of ledger transactions materialized.
    pub materialized: usize,
    /// The number of schedules that finished (passed their end date).
    pub completed: usize,
    /// The number of schedules that failed to advance.
    pub failed: usize,
}

/// Materialize every active schedule whose next execution is on or before
/// `today` and not past its end date.
///
/// A schedule that is several periods behind (the server was down, or the
/// date jumped) is caught up one occurrence per call to this function per
/// period, because each pass advances `next_execution` by one unit and the
/// schedule stays due until it catches up. The loop below keeps going until
/// nothing is due anymore.
///
/// # Errors
/// This function will return an [Error::SqlError] if the due-schedule query
/// itself fails. Failures while advancing individual schedules are logged
/// and counted in the returned [AdvanceOutcome] instead.
pub fn advance_due_schedules(
    today: Date,
    connection: &mut Connection,
) -> Result<AdvanceOutcome, Error> {
    let mut outcome = AdvanceOutcome::default();

    loop {
        let due = list_due_schedules(today, connection)?;

        if due.is_empty() {
            break;
        }

        let mut advanced_any = false;

        for schedule in due {
            match advance_schedule(&schedule, today, connection) {
                Ok(finished) => {
                    advanced_any = true;
                    outcome.materialized += 1;
                    if finished {
                        outcome.completed += 1;
                    }
                }
                Err(error) => {
                    tracing::error!(
                        "could not advance schedule {} (\"{}\"): {error}",
                        schedule.id,
                        schedule.description
                    );
                    outcome.failed += 1;
                }
            }
        }

        // If every due schedule failed, another pass would fail the same way.
        if !advanced_any {
            break;
        }
    }

    Ok(outcome)
}

fn list_due_schedules(
    today: Date,
    connection: &Connection,
) -> Result<Vec<ScheduledTransaction>, Error> {
    let schedules = connection
        .prepare(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM scheduled_transaction
             WHERE status = 'active'
               AND next_execution <= :today
               AND (end_date IS NULL OR next_execution <= end_date)"
        ))?
        .query_map(&[(":today", &today)], map_schedule_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(schedules)
}

/// Materialize one occurrence of `schedule` and advance its bookkeeping.
///
/// Returns whether the schedule finished (its new next execution falls after
/// the end date).
fn advance_schedule(
    schedule: &ScheduledTransaction,
    today: Date,
    connection: &mut Connection,
) -> Result<bool, Error> {
    let sql_transaction =
        connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

    create_transaction(
        Transaction::build(
            schedule.user_id,
            schedule.transaction_type,
            &schedule.category,
            schedule.amount,
            today,
            &schedule.description,
        )
        .payment_method(&schedule.payment_method)
        .from_schedule(schedule.id, schedule.frequency, schedule.end_date),
        &sql_transaction,
    )?;

    let next_execution = advance_date(schedule.next_execution, schedule.frequency);
    let finished = schedule
        .end_date
        .is_some_and(|end_date| next_execution > end_date);
    let status = if finished {
        ScheduleStatus::Completed
    } else {
        schedule.status
    };

    sql_transaction.execute(
        "UPDATE scheduled_transaction
         SET last_execution = ?1, next_execution = ?2, status = ?3
         WHERE id = ?4",
        rusqlite::params![today, next_execution, status.as_str(), schedule.id],
    )?;

    sql_transaction.commit()?;

    tracing::info!(
        "materialized scheduled transaction {} (\"{}\") for {today}, next execution {next_execution}",
        schedule.id,
        schedule.description
    );

    Ok(finished)
}

/// Spawn the background task that advances due schedules once an hour.
///
/// The first run happens immediately so a server that was down over a due
/// date catches up on start.
pub fn start_advancer_task(state: AppState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(ADVANCER_INTERVAL);

        loop {
            interval.tick().await;

            let today = local_date_today(&state.local_timezone);
            let result = {
                let mut connection = match state.db_connection.lock() {
                    Ok(connection) => connection,
                    Err(_) => {
                        tracing::error!("advancer could not acquire the database connection");
                        continue;
                    }
                };

                advance_due_schedules(today, &mut connection)
            };

            match result {
                Ok(outcome) if outcome.materialized > 0 || outcome.failed > 0 => {
                    tracing::info!(
                        "advancer run for {today}: {} materialized, {} completed, {} failed",
                        outcome.materialized,
                        outcome.completed,
                        outcome.failed
                    );
                }
                Ok(_) => {}
                Err(error) => tracing::error!("advancer run for {today} failed: {error}"),
            }
        }
    })
}

#[cfg(test)]
mod advancer_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        PasswordHash,
        db::initialize,
        scheduled::core::{
            Frequency, NewSchedule, ScheduleStatus, create_schedule, get_schedule,
        },
        transaction::core::{TransactionType, list_transactions},
        user::{UserId, create_user},
    };

    use super::advance_due_schedules;

    fn get_test_connection() -> (Connection, UserId) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let user = create_user("test@test.com", PasswordHash::new_unchecked("hunter2"), &conn)
            .unwrap();

        (conn, user.id)
    }

    fn new_salary_schedule(start_date: time::Date) -> NewSchedule {
        NewSchedule {
            description: "Salary".to_string(),
            amount: 2500.0,
            transaction_type: TransactionType::Income,
            category: "Salary".to_string(),
            payment_method: "Bank-Transfer".to_string(),
            frequency: Frequency::Monthly,
            start_date,
            end_date: None,
        }
    }

    #[test]
    fn due_schedule_materializes_transaction_and_advances() {
        let (mut conn, user_id) = get_test_connection();
        let schedule =
            create_schedule(user_id, new_salary_schedule(date!(2024 - 03 - 01)), &conn).unwrap();

        let outcome = advance_due_schedules(date!(2024 - 03 - 01), &mut conn).unwrap();

        assert_eq!(outcome.materialized, 1);
        assert_eq!(outcome.failed, 0);

        let transactions = list_transactions(user_id, &conn).unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].amount, 2500.0);
        assert_eq!(transactions[0].date, date!(2024 - 03 - 01));
        assert_eq!(transactions[0].parent_schedule_id, Some(schedule.id));
        assert!(transactions[0].is_scheduled);

        let advanced = get_schedule(schedule.id, user_id, &conn).unwrap();
        assert_eq!(advanced.last_execution, Some(date!(2024 - 03 - 01)));
        assert_eq!(advanced.next_execution, date!(2024 - 04 - 01));
    }

    #[test]
    fn schedule_not_yet_due_is_untouched() {
        let (mut conn, user_id) = get_test_connection();
        create_schedule(user_id, new_salary_schedule(date!(2024 - 05 - 01)), &conn).unwrap();

        let outcome = advance_due_schedules(date!(2024 - 04 - 30), &mut conn).unwrap();

        assert_eq!(outcome.materialized, 0);
        assert!(list_transactions(user_id, &conn).unwrap().is_empty());
    }

    #[test]
    fn paused_schedule_is_skipped() {
        let (mut conn, user_id) = get_test_connection();
        let schedule =
            create_schedule(user_id, new_salary_schedule(date!(2024 - 03 - 01)), &conn).unwrap();
        crate::scheduled::core::set_schedule_status(
            schedule.id,
            user_id,
            ScheduleStatus::Paused,
            &conn,
        )
        .unwrap();

        let outcome = advance_due_schedules(date!(2024 - 03 - 01), &mut conn).unwrap();

        assert_eq!(outcome.materialized, 0);
        assert!(list_transactions(user_id, &conn).unwrap().is_empty());
    }

    #[test]
    fn overdue_schedule_catches_up_all_missed_periods() {
        let (mut conn, user_id) = get_test_connection();
        let schedule =
            create_schedule(user_id, new_salary_schedule(date!(2024 - 01 - 01)), &conn).unwrap();

        // Three months behind: January, February and March are all due.
        let outcome = advance_due_schedules(date!(2024 - 03 - 15), &mut conn).unwrap();

        assert_eq!(outcome.materialized, 3);

        let transactions = list_transactions(user_id, &conn).unwrap();
        assert_eq!(transactions.len(), 3);

        let advanced = get_schedule(schedule.id, user_id, &conn).unwrap();
        assert_eq!(advanced.next_execution, date!(2024 - 04 - 01));
    }

    #[test]
    fn schedule_completes_when_next_execution_passes_end_date() {
        let (mut conn, user_id) = get_test_connection();
        let mut definition = new_salary_schedule(date!(2024 - 03 - 01));
        definition.end_date = Some(date!(2024 - 03 - 31));
        let schedule = create_schedule(user_id, definition, &conn).unwrap();

        let outcome = advance_due_schedules(date!(2024 - 03 - 01), &mut conn).unwrap();

        assert_eq!(outcome.materialized, 1);
        assert_eq!(outcome.completed, 1);

        let finished = get_schedule(schedule.id, user_id, &conn).unwrap();
        assert_eq!(finished.status, ScheduleStatus::Completed);

        // A later run must not produce another occurrence.
        let outcome = advance_due_schedules(date!(2024 - 05 - 01), &mut conn).unwrap();
        assert_eq!(outcome.materialized, 0);
        assert_eq!(list_transactions(user_id, &conn).unwrap().len(), 1);
    }

    #[test]
    fn failed_schedule_leaves_no_partial_state() {
        let (mut conn, user_id) = get_test_connection();
        let schedule =
            create_schedule(user_id, new_salary_schedule(date!(2024 - 03 - 01)), &conn).unwrap();

        // Make ledger inserts fail while keeping reads working.
        conn.execute_batch(
            "ALTER TABLE \"transaction\" RENAME TO transaction_backup;
             CREATE VIEW \"transaction\" AS SELECT * FROM transaction_backup;",
        )
        .unwrap();

        let outcome = advance_due_schedules(date!(2024 - 03 - 01), &mut conn).unwrap();

        assert_eq!(outcome.materialized, 0);
        assert_eq!(outcome.failed, 1);

        let untouched = get_schedule(schedule.id, user_id, &conn).unwrap();
        assert_eq!(untouched.last_execution, None);
        assert_eq!(untouched.next_execution, date!(2024 - 03 - 01));
    }
}
