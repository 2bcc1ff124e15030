//! Defines the dashboard summary endpoint.
//!
//! Aggregates the user's ledger into the numbers the dashboard page needs:
//! total income, total expenses, the derived balance, and per-category and
//! per-month breakdowns. Everything is recomputed from the ledger on demand;
//! nothing here is cached or stored.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Serialize;
use time::Date;

use crate::{
    AppState, Error,
    money::round_to_cents,
    transaction::core::{Transaction, TransactionType, list_transactions},
    user::UserId,
};

/// The state needed to compute the dashboard summary.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The total amount for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// The category name.
    pub category: String,
    /// Whether the category holds income or expenses.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The summed amount for the category.
    pub total: f64,
}

/// The income and expense totals for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotal {
    /// The month in "YYYY-MM" form.
    pub month: String,
    /// Income recorded in the month.
    pub income: f64,
    /// Expenses recorded in the month.
    pub expenses: f64,
}

/// The aggregate summary served to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    /// The sum of all income transactions.
    pub total_income: f64,
    /// The sum of all expense transactions.
    pub total_expenses: f64,
    /// The derived balance (income minus expenses).
    pub balance: f64,
    /// Totals per category, largest first.
    pub by_category: Vec<CategoryTotal>,
    /// Totals per calendar month, chronological.
    pub monthly: Vec<MonthlyTotal>,
}

/// Aggregate `transactions` into a [DashboardSummary].
pub(crate) fn summarize(transactions: &[Transaction]) -> DashboardSummary {
    let mut total_income = 0.0;
    let mut total_expenses = 0.0;
    let mut category_totals: HashMap<(String, TransactionType), f64> = HashMap::new();
    let mut monthly_totals: HashMap<Date, (f64, f64)> = HashMap::new();

    for transaction in transactions {
        match transaction.transaction_type {
            TransactionType::Income => total_income += transaction.amount,
            TransactionType::Expense => total_expenses += transaction.amount,
        }

        *category_totals
            .entry((transaction.category.clone(), transaction.transaction_type))
            .or_insert(0.0) += transaction.amount;

        // Day-of-month information is irrelevant here, bucket by the first of
        // the month.
        let month = transaction
            .date
            .replace_day(1)
            .expect("day 1 is valid for every month");
        let entry = monthly_totals.entry(month).or_insert((0.0, 0.0));
        match transaction.transaction_type {
            TransactionType::Income => entry.0 += transaction.amount,
            TransactionType::Expense => entry.1 += transaction.amount,
        }
    }

    let mut by_category: Vec<CategoryTotal> = category_totals
        .into_iter()
        .map(|((category, transaction_type), total)| CategoryTotal {
            category,
            transaction_type,
            total: round_to_cents(total),
        })
        .collect();
    by_category.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.category.cmp(&b.category))
    });

    let mut months: Vec<Date> = monthly_totals.keys().copied().collect();
    months.sort();
    let monthly = months
        .into_iter()
        .map(|month| {
            let (income, expenses) = monthly_totals[&month];
            MonthlyTotal {
                month: format!("{:04}-{:02}", month.year(), month.month() as u8),
                income: round_to_cents(income),
                expenses: round_to_cents(expenses),
            }
        })
        .collect();

    DashboardSummary {
        total_income: round_to_cents(total_income),
        total_expenses: round_to_cents(total_expenses),
        balance: round_to_cents(total_income - total_expenses),
        by_category,
        monthly,
    }
}

/// A route handler for the dashboard summary.
pub async fn get_dashboard_endpoint(
    State(state): State<DashboardState>,
    axum::Extension(user_id): axum::Extension<UserId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    match list_transactions(user_id, &connection) {
        Ok(transactions) => Json(summarize(&transactions)).into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod dashboard_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        PasswordHash,
        db::initialize,
        transaction::core::{Transaction, TransactionType, create_transaction, list_transactions},
        user::{UserId, create_user},
    };

    use super::{DashboardState, get_dashboard_endpoint, summarize};

    fn get_test_connection() -> (Connection, UserId) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let user = create_user("test@test.com", PasswordHash::new_unchecked("hunter2"), &conn)
            .unwrap();

        (conn, user.id)
    }

    fn add_transaction(
        user_id: UserId,
        transaction_type: TransactionType,
        category: &str,
        amount: f64,
        date: time::Date,
        conn: &Connection,
    ) {
        create_transaction(
            Transaction::build(user_id, transaction_type, category, amount, date, "test"),
            conn,
        )
        .unwrap();
    }

    #[test]
    fn summary_totals_and_balance() {
        let (conn, user_id) = get_test_connection();
        add_transaction(
            user_id,
            TransactionType::Income,
            "Salary",
            1000.0,
            date!(2024 - 01 - 15),
            &conn,
        );
        add_transaction(
            user_id,
            TransactionType::Expense,
            "Food",
            150.0,
            date!(2024 - 01 - 20),
            &conn,
        );
        add_transaction(
            user_id,
            TransactionType::Expense,
            "Food",
            100.0,
            date!(2024 - 02 - 02),
            &conn,
        );

        let summary = summarize(&list_transactions(user_id, &conn).unwrap());

        assert_eq!(summary.total_income, 1000.0);
        assert_eq!(summary.total_expenses, 250.0);
        assert_eq!(summary.balance, 750.0);
    }

    #[test]
    fn summary_groups_by_category_and_month() {
        let (conn, user_id) = get_test_connection();
        add_transaction(
            user_id,
            TransactionType::Expense,
            "Food",
            30.0,
            date!(2024 - 01 - 05),
            &conn,
        );
        add_transaction(
            user_id,
            TransactionType::Expense,
            "Food",
            20.0,
            date!(2024 - 01 - 25),
            &conn,
        );
        add_transaction(
            user_id,
            TransactionType::Expense,
            "Housing",
            900.0,
            date!(2024 - 02 - 01),
            &conn,
        );

        let summary = summarize(&list_transactions(user_id, &conn).unwrap());

        assert_eq!(summary.by_category.len(), 2);
        // Largest category first.
        assert_eq!(summary.by_category[0].category, "Housing");
        assert_eq!(summary.by_category[1].total, 50.0);

        assert_eq!(summary.monthly.len(), 2);
        assert_eq!(summary.monthly[0].month, "2024-01");
        assert_eq!(summary.monthly[0].expenses, 50.0);
        assert_eq!(summary.monthly[1].month, "2024-02");
        assert_eq!(summary.monthly[1].expenses, 900.0);
    }

    #[test]
    fn empty_ledger_gives_zeroed_summary() {
        let summary = summarize(&[]);

        assert_eq!(summary.total_income, 0.0);
        assert_eq!(summary.total_expenses, 0.0);
        assert_eq!(summary.balance, 0.0);
        assert!(summary.by_category.is_empty());
        assert!(summary.monthly.is_empty());
    }

    #[tokio::test]
    async fn dashboard_endpoint_returns_summary_json() {
        let (conn, user_id) = get_test_connection();
        add_transaction(
            user_id,
            TransactionType::Income,
            "Salary",
            500.0,
            date!(2024 - 01 - 15),
            &conn,
        );

        let state = DashboardState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response = get_dashboard_endpoint(State(state), Extension(user_id))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let summary: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(summary["balance"], 500.0);
        assert_eq!(summary["total_income"], 500.0);
    }
}
