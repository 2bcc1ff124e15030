//! Defines the core data model and database queries for scheduled
//! (recurring) transactions.
//!
//! A scheduled transaction is a template that the advancer
//! ([crate::scheduled::advancer]) periodically materializes into concrete
//! ledger transactions. `next_execution` always points at the earliest
//! occurrence that has not been materialized yet.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, types::Type};
use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month, util::days_in_month};

use crate::{
    Error,
    database_id::ScheduleId,
    money::{round_to_cents, validate_amount},
    transaction::core::{TransactionType, validate_category},
    user::UserId,
};

/// How often a scheduled transaction recurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// Every day.
    Daily,
    /// Every seven days.
    Weekly,
    /// Every calendar month, clamped to the last day of shorter months.
    Monthly,
    /// Every calendar year, clamped for the 29th of February.
    Yearly,
}

impl Frequency {
    /// The string stored in the database for this frequency.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl FromStr for Frequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(Error::InvalidFrequency(other.to_string())),
        }
    }
}

impl Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a scheduled transaction is still producing occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    /// Occurrences are materialized when due.
    Active,
    /// Temporarily suspended by the user; due dates pass by unmaterialized.
    Paused,
    /// The next occurrence would fall after the end date; the schedule is
    /// finished.
    Completed,
}

impl ScheduleStatus {
    /// The string stored in the database for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for ScheduleStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            other => Err(Error::InvalidScheduleStatus(other.to_string())),
        }
    }
}

/// A recurring-transaction template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTransaction {
    /// The ID of the scheduled transaction.
    pub id: ScheduleId,
    /// The user that owns this schedule.
    pub user_id: UserId,
    /// The description copied onto each materialized transaction.
    pub description: String,
    /// The amount of each occurrence. Always positive.
    pub amount: f64,
    /// Whether occurrences are income or expenses.
    pub transaction_type: TransactionType,
    /// The category copied onto each occurrence.
    pub category: String,
    /// The payment method copied onto each occurrence.
    pub payment_method: String,
    /// How often the transaction recurs.
    pub frequency: Frequency,
    /// The date of the first occurrence.
    pub start_date: Date,
    /// The date after which no more occurrences happen, if set.
    pub end_date: Option<Date>,
    /// Whether the schedule is active, paused or finished.
    pub status: ScheduleStatus,
    /// When the schedule last materialized an occurrence.
    pub last_execution: Option<Date>,
    /// The earliest not-yet-materialized occurrence.
    pub next_execution: Date,
}

/// Advance `date` by one unit of `frequency`.
///
/// Calendar-month and calendar-year steps clamp the day of month to the last
/// day of the target month, so a schedule anchored on the 31st fires on the
/// 28th/29th/30th in shorter months: 2024-01-31 advances to 2024-02-29.
pub fn advance_date(date: Date, frequency: Frequency) -> Date {
    match frequency {
        Frequency::Daily => date + Duration::days(1),
        Frequency::Weekly => date + Duration::days(7),
        Frequency::Monthly => add_calendar_months(date, 1),
        Frequency::Yearly => add_calendar_months(date, 12),
    }
}

fn add_calendar_months(date: Date, months: i32) -> Date {
    let zero_based_month = date.month() as i32 - 1 + months;
    let year = date.year() + zero_based_month.div_euclid(12);
    let month = Month::try_from((zero_based_month.rem_euclid(12) + 1) as u8)
        .expect("month is always in 1..=12 after rem_euclid");

    let day = date.day().min(days_in_month(month, year));

    Date::from_calendar_date(year, month, day)
        .expect("clamped day is always valid for the target month")
}

/// Create the scheduled transaction table.
pub fn create_scheduled_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS scheduled_transaction (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES user(id),
                description TEXT NOT NULL,
                amount REAL NOT NULL CHECK (amount > 0),
                type TEXT NOT NULL,
                category TEXT NOT NULL,
                payment_method TEXT NOT NULL,
                frequency TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                last_execution TEXT,
                next_execution TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Map a `rusqlite` row to a [ScheduledTransaction].
///
/// The column order must match the SELECT/RETURNING clauses used in this
/// module.
pub fn map_schedule_row(row: &Row) -> Result<ScheduledTransaction, rusqlite::Error> {
    let transaction_type: String = row.get(4)?;
    let transaction_type = TransactionType::from_str(&transaction_type)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(error)))?;

    let frequency: String = row.get(7)?;
    let frequency = Frequency::from_str(&frequency)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(error)))?;

    let status: String = row.get(10)?;
    let status = ScheduleStatus::from_str(&status).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(error))
    })?;

    Ok(ScheduledTransaction {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        description: row.get(2)?,
        amount: row.get(3)?,
        transaction_type,
        category: row.get(5)?,
        payment_method: row.get(6)?,
        frequency,
        start_date: row.get(8)?,
        end_date: row.get(9)?,
        status,
        last_execution: row.get(11)?,
        next_execution: row.get(12)?,
    })
}

pub(crate) const SCHEDULE_COLUMNS: &str = "id, user_id, description, amount, type, category, \
     payment_method, frequency, start_date, end_date, status, last_execution, next_execution";

/// The data needed to create or overwrite a scheduled transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSchedule {
    /// The description copied onto each occurrence.
    pub description: String,
    /// The amount of each occurrence.
    pub amount: f64,
    /// Whether occurrences are income or expenses.
    pub transaction_type: TransactionType,
    /// The category copied onto each occurrence.
    pub category: String,
    /// The payment method copied onto each occurrence.
    pub payment_method: String,
    /// How often the transaction recurs.
    pub frequency: Frequency,
    /// The date of the first occurrence.
    pub start_date: Date,
    /// The date after which no more occurrences happen, if set.
    pub end_date: Option<Date>,
}

/// Create a new scheduled transaction owned by `user_id`.
///
/// The first occurrence is the start date, so `next_execution` starts there.
///
/// # Errors
/// This function will return an [Error::InvalidAmount] or
/// [Error::InvalidCategory] if the definition is invalid, or an
/// [Error::SqlError] if there is some other SQL error.
pub fn create_schedule(
    user_id: UserId,
    new_schedule: NewSchedule,
    connection: &Connection,
) -> Result<ScheduledTransaction, Error> {
    validate_amount(new_schedule.amount)?;
    validate_category(new_schedule.transaction_type, &new_schedule.category)?;

    let schedule = connection
        .prepare(&format!(
            "INSERT INTO scheduled_transaction (user_id, description, amount, type, category, \
             payment_method, frequency, start_date, end_date, status, last_execution, next_execution)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'active', NULL, ?10)
             RETURNING {SCHEDULE_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                user_id.as_i64(),
                new_schedule.description,
                round_to_cents(new_schedule.amount),
                new_schedule.transaction_type.as_str(),
                new_schedule.category,
                new_schedule.payment_method,
                new_schedule.frequency.as_str(),
                new_schedule.start_date,
                new_schedule.end_date,
                new_schedule.start_date,
            ],
            map_schedule_row,
        )?;

    Ok(schedule)
}

/// Retrieve the scheduled transaction with `id` owned by `user_id`.
///
/// # Errors
/// This function will return an [Error::NotFound] if `id` does not refer to a
/// schedule owned by `user_id`, or an [Error::SqlError] if there is some
/// other SQL error.
pub fn get_schedule(
    id: ScheduleId,
    user_id: UserId,
    connection: &Connection,
) -> Result<ScheduledTransaction, Error> {
    let schedule = connection
        .prepare(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM scheduled_transaction
             WHERE id = :id AND user_id = :user_id"
        ))?
        .query_row(
            &[(":id", &id), (":user_id", &user_id.as_i64())],
            map_schedule_row,
        )?;

    Ok(schedule)
}

/// Retrieve all of a user's scheduled transactions, most recently created
/// first.
///
/// # Errors
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn list_schedules(
    user_id: UserId,
    connection: &Connection,
) -> Result<Vec<ScheduledTransaction>, Error> {
    let schedules = connection
        .prepare(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM scheduled_transaction
             WHERE user_id = :user_id ORDER BY id DESC"
        ))?
        .query_map(&[(":user_id", &user_id.as_i64())], map_schedule_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(schedules)
}

/// Overwrite the definition fields of the schedule with `id` owned by
/// `user_id`.
///
/// `next_execution` is reset to the new start date if the new start date is
/// later than the current `next_execution`, so editing a schedule forward
/// does not leave a stale due date behind.
///
/// # Errors
/// This function will return an [Error::InvalidAmount],
/// [Error::InvalidCategory], [Error::NotFound] or [Error::SqlError].
pub fn update_schedule(
    id: ScheduleId,
    user_id: UserId,
    update: NewSchedule,
    connection: &Connection,
) -> Result<ScheduledTransaction, Error> {
    validate_amount(update.amount)?;
    validate_category(update.transaction_type, &update.category)?;

    let schedule = connection
        .prepare(&format!(
            "UPDATE scheduled_transaction
             SET description = ?1, amount = ?2, type = ?3, category = ?4, payment_method = ?5,
                 frequency = ?6, start_date = ?7, end_date = ?8,
                 next_execution = MAX(next_execution, ?7)
             WHERE id = ?9 AND user_id = ?10
             RETURNING {SCHEDULE_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                update.description,
                round_to_cents(update.amount),
                update.transaction_type.as_str(),
                update.category,
                update.payment_method,
                update.frequency.as_str(),
                update.start_date,
                update.end_date,
                id,
                user_id.as_i64(),
            ],
            map_schedule_row,
        )?;

    Ok(schedule)
}

/// Set the status of the schedule with `id` owned by `user_id`.
///
/// # Errors
/// This function will return an [Error::NotFound] if `id` does not refer to a
/// schedule owned by `user_id`, or an [Error::SqlError] if there is some
/// other SQL error.
pub fn set_schedule_status(
    id: ScheduleId,
    user_id: UserId,
    status: ScheduleStatus,
    connection: &Connection,
) -> Result<ScheduledTransaction, Error> {
    let schedule = connection
        .prepare(&format!(
            "UPDATE scheduled_transaction SET status = ?1 WHERE id = ?2 AND user_id = ?3
             RETURNING {SCHEDULE_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![status.as_str(), id, user_id.as_i64()],
            map_schedule_row,
        )?;

    Ok(schedule)
}

/// Delete the schedule with `id` owned by `user_id`.
///
/// Transactions already materialized from the schedule are kept; they are
/// history, not part of the template.
///
/// # Errors
/// This function will return an [Error::NotFound] if `id` does not refer to a
/// schedule owned by `user_id`, or an [Error::SqlError] if there is some
/// other SQL error.
pub fn delete_schedule(
    id: ScheduleId,
    user_id: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM scheduled_transaction WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        Err(Error::NotFound)
    } else {
        Ok(())
    }
}
