//! Defines the core data models and database queries for ledger transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, types::Type};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    database_id::{DatabaseId, GoalId, ScheduleId},
    money::{round_to_cents, validate_amount},
    scheduled::Frequency,
    user::UserId,
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether a transaction adds money to or removes money from the user's
/// balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Money earned, increases the balance.
    Income,
    /// Money spent, decreases the balance.
    Expense,
}

impl TransactionType {
    /// The string stored in the database for this transaction type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(Error::InvalidTransactionType(other.to_string())),
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a transaction has been settled or is still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// The money has moved.
    Completed,
    /// The transaction is expected but has not settled yet.
    Pending,
}

impl TransactionStatus {
    /// The string stored in the database for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Pending => "pending",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(Self::Completed),
            "pending" => Ok(Self::Pending),
            other => Err(Error::InvalidTransactionStatus(other.to_string())),
        }
    }
}

/// The categories that an income transaction may use.
pub const INCOME_CATEGORIES: [&str; 7] = [
    "Salary",
    "Freelance",
    "Investment",
    "Business",
    "Rental",
    "Gift",
    "Other-Income",
];

/// The categories that an expense transaction may use.
pub const EXPENSE_CATEGORIES: [&str; 10] = [
    "Housing",
    "Transportation",
    "Food",
    "Utilities",
    "Insurance",
    "Healthcare",
    "Entertainment",
    "Shopping",
    "Education",
    "Other-Expense",
];

/// Check that `category` is valid for `transaction_type`.
///
/// # Errors
///
/// Returns an [Error::InvalidCategory] if the category is not in the list for
/// the transaction type.
pub fn validate_category(transaction_type: TransactionType, category: &str) -> Result<(), Error> {
    let categories: &[&str] = match transaction_type {
        TransactionType::Income => &INCOME_CATEGORIES,
        TransactionType::Expense => &EXPENSE_CATEGORIES,
    };

    if categories.contains(&category) {
        Ok(())
    } else {
        Err(Error::InvalidCategory(category.to_string()))
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: DatabaseId,
    /// The user that owns this transaction.
    pub user_id: UserId,
    /// Whether the transaction is an income or expense.
    pub transaction_type: TransactionType,
    /// The category of the transaction, e.g. "Food" or "Salary".
    pub category: String,
    /// The amount of money spent or earned in this transaction. Always positive.
    pub amount: f64,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// How the money moved, e.g. "Cash" or "Credit-Card".
    pub payment_method: String,
    /// Whether the transaction has settled.
    pub status: TransactionStatus,
    /// The goal this transaction contributes to, if any. An association only,
    /// deleting the goal does not delete this transaction.
    pub goal_id: Option<GoalId>,
    /// The scheduled transaction definition this transaction was materialized
    /// from, if any.
    pub parent_schedule_id: Option<ScheduleId>,
    /// Whether this transaction was materialized from a scheduled definition.
    pub is_scheduled: bool,
    /// The recurrence frequency copied from the scheduled definition, if any.
    pub frequency: Option<Frequency>,
    /// The recurrence end date copied from the scheduled definition, if any.
    pub recurrence_end_date: Option<Date>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        user_id: UserId,
        transaction_type: TransactionType,
        category: &str,
        amount: f64,
        date: Date,
        description: &str,
    ) -> TransactionBuilder {
        TransactionBuilder {
            user_id,
            transaction_type,
            category: category.to_owned(),
            amount,
            date,
            description: description.to_owned(),
            payment_method: DEFAULT_PAYMENT_METHOD.to_owned(),
            status: TransactionStatus::Completed,
            goal_id: None,
            parent_schedule_id: None,
            is_scheduled: false,
            frequency: None,
            recurrence_end_date: None,
        }
    }
}

/// The payment method recorded when the client does not specify one.
pub const DEFAULT_PAYMENT_METHOD: &str = "Other";

/// A builder for creating [Transaction] instances.
///
/// Optional fields default to sensible values; call the setters to override
/// them, then pass the builder to [create_transaction].
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The user that will own the transaction.
    pub user_id: UserId,
    /// Whether the transaction is an income or expense.
    pub transaction_type: TransactionType,
    /// The category of the transaction.
    pub category: String,
    /// The monetary amount of the transaction. Must be positive; the
    /// direction of the money flow is carried by `transaction_type`.
    pub amount: f64,
    /// The date when the transaction occurred.
    pub date: Date,
    /// A human-readable description of the transaction.
    pub description: String,
    /// How the money moved. Defaults to [DEFAULT_PAYMENT_METHOD].
    pub payment_method: String,
    /// Whether the transaction has settled. Defaults to completed.
    pub status: TransactionStatus,
    /// The goal this transaction contributes to, if any.
    pub goal_id: Option<GoalId>,
    /// The scheduled definition this transaction was materialized from, if any.
    pub parent_schedule_id: Option<ScheduleId>,
    /// Whether this transaction was materialized from a scheduled definition.
    pub is_scheduled: bool,
    /// The recurrence frequency copied from the scheduled definition.
    pub frequency: Option<Frequency>,
    /// The recurrence end date copied from the scheduled definition.
    pub recurrence_end_date: Option<Date>,
}

impl TransactionBuilder {
    /// Set the payment method for the transaction.
    pub fn payment_method(mut self, payment_method: &str) -> Self {
        self.payment_method = payment_method.to_owned();
        self
    }

    /// Set the status for the transaction.
    pub fn status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the goal that the transaction contributes to.
    pub fn goal_id(mut self, goal_id: Option<GoalId>) -> Self {
        self.goal_id = goal_id;
        self
    }

    /// Mark the transaction as materialized from the scheduled definition
    /// `schedule_id` and copy over its recurrence metadata.
    pub fn from_schedule(
        mut self,
        schedule_id: ScheduleId,
        frequency: Frequency,
        recurrence_end_date: Option<Date>,
    ) -> Self {
        self.parent_schedule_id = Some(schedule_id);
        self.is_scheduled = true;
        self.frequency = Some(frequency);
        self.recurrence_end_date = recurrence_end_date;
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the ledger transaction table.
///
/// Note that `goal_id` deliberately has no cascade delete: deleting a goal
/// appends a compensating refund transaction instead of destroying history.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES user(id),
                type TEXT NOT NULL,
                category TEXT NOT NULL,
                amount REAL NOT NULL CHECK (amount > 0),
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                payment_method TEXT NOT NULL,
                status TEXT NOT NULL,
                goal_id INTEGER,
                parent_schedule_id INTEGER,
                is_scheduled INTEGER NOT NULL DEFAULT 0,
                frequency TEXT,
                recurrence_end_date TEXT
                )",
        (),
    )?;

    Ok(())
}

/// Map a `rusqlite` row to a [Transaction].
///
/// The column order must match the SELECT/RETURNING clauses used in this
/// module.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let transaction_type: String = row.get(2)?;
    let transaction_type = TransactionType::from_str(&transaction_type)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(error)))?;

    let status: String = row.get(8)?;
    let status = TransactionStatus::from_str(&status)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(error)))?;

    let frequency: Option<String> = row.get(12)?;
    let frequency = frequency
        .map(|raw| {
            Frequency::from_str(&raw).map_err(|error| {
                rusqlite::Error::FromSqlConversionFailure(12, Type::Text, Box::new(error))
            })
        })
        .transpose()?;

    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        transaction_type,
        category: row.get(3)?,
        amount: row.get(4)?,
        date: row.get(5)?,
        description: row.get(6)?,
        payment_method: row.get(7)?,
        status,
        goal_id: row.get(9)?,
        parent_schedule_id: row.get(10)?,
        is_scheduled: row.get(11)?,
        frequency,
        recurrence_end_date: row.get(13)?,
    })
}

const TRANSACTION_COLUMNS: &str = "id, user_id, type, category, amount, date, description, \
     payment_method, status, goal_id, parent_schedule_id, is_scheduled, frequency, \
     recurrence_end_date";

/// Create a new transaction in the database from a builder.
///
/// The amount is rounded to two decimal places before it is stored.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if the amount is not positive,
/// - or [Error::InvalidCategory] if the category is not valid for the
///   transaction type,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    validate_amount(builder.amount)?;
    validate_category(builder.transaction_type, &builder.category)?;

    let transaction = connection
        .prepare(&format!(
            "INSERT INTO \"transaction\" (user_id, type, category, amount, date, description, \
             payment_method, status, goal_id, parent_schedule_id, is_scheduled, frequency, \
             recurrence_end_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                builder.user_id.as_i64(),
                builder.transaction_type.as_str(),
                builder.category,
                round_to_cents(builder.amount),
                builder.date,
                builder.description,
                builder.payment_method,
                builder.status.as_str(),
                builder.goal_id,
                builder.parent_schedule_id,
                builder.is_scheduled,
                builder.frequency.map(|frequency| frequency.as_str()),
                builder.recurrence_end_date,
            ],
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve the transaction with `id` owned by `user_id`.
///
/// # Errors
/// This function will return an [Error::NotFound] if `id` does not refer to a
/// transaction owned by `user_id`, or an [Error::SqlError] if there is some
/// other SQL error.
pub fn get_transaction(
    id: DatabaseId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = :id AND user_id = :user_id"
        ))?
        .query_row(
            &[(":id", &id), (":user_id", &user_id.as_i64())],
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve all of a user's transactions, newest first.
///
/// Returns an empty vector if the user has no transactions.
///
/// # Errors
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn list_transactions(user_id: UserId, connection: &Connection) -> Result<Vec<Transaction>, Error> {
    let transactions = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"
             WHERE user_id = :user_id
             ORDER BY date DESC, id DESC"
        ))?
        .query_map(&[(":user_id", &user_id.as_i64())], map_transaction_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(transactions)
}

/// The fields of a transaction that may be changed after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionUpdate {
    /// The new transaction type.
    pub transaction_type: TransactionType,
    /// The new category, validated against the new type.
    pub category: String,
    /// The new amount.
    pub amount: f64,
    /// The new date.
    pub date: Date,
    /// The new description.
    pub description: String,
    /// The new payment method.
    pub payment_method: String,
    /// The new status.
    pub status: TransactionStatus,
}

/// Overwrite the mutable fields of the transaction with `id` owned by
/// `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] or [Error::InvalidCategory] if the update is
///   invalid,
/// - or [Error::NotFound] if `id` does not refer to a transaction owned by
///   `user_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    id: DatabaseId,
    user_id: UserId,
    update: TransactionUpdate,
    connection: &Connection,
) -> Result<Transaction, Error> {
    validate_amount(update.amount)?;
    validate_category(update.transaction_type, &update.category)?;

    let transaction = connection
        .prepare(&format!(
            "UPDATE \"transaction\"
             SET type = ?1, category = ?2, amount = ?3, date = ?4, description = ?5,
                 payment_method = ?6, status = ?7
             WHERE id = ?8 AND user_id = ?9
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                update.transaction_type.as_str(),
                update.category,
                round_to_cents(update.amount),
                update.date,
                update.description,
                update.payment_method,
                update.status.as_str(),
                id,
                user_id.as_i64(),
            ],
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Delete the transaction with `id` owned by `user_id`.
///
/// # Errors
/// This function will return an [Error::NotFound] if `id` does not refer to a
/// transaction owned by `user_id`, or an [Error::SqlError] if there is some
/// other SQL error.
pub fn delete_transaction(
    id: DatabaseId,
    user_id: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        Err(Error::NotFound)
    } else {
        Ok(())
    }
}

/// Get the number of transactions in the database.
#[cfg(test)]
pub fn count_transactions(connection: &Connection) -> Result<i64, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\"", [], |row| row.get(0))
        .map_err(|error| error.into())
}
