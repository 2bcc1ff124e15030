//! Database schema initialization.

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{
    Error, goal::create_goal_table, scheduled::create_scheduled_transaction_table,
    transaction::create_transaction_table, user::create_user_table,
};

/// Create the tables for the domain models if they do not already exist.
///
/// All tables are created within a single exclusive transaction so a crash
/// cannot leave a partially created schema.
///
/// # Errors
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_goal_table(&transaction)?;
    create_scheduled_transaction_table(&transaction)?;
    create_transaction_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

#[cfg(test)]
mod db_tests {
    use rusqlite::Connection;

    use super::initialize;

    #[test]
    fn initialize_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();

        initialize(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(name) FROM sqlite_master
                 WHERE type = 'table'
                 AND name IN ('user', 'goal', 'scheduled_transaction', 'transaction')",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert_eq!(count, 4);
    }

    #[test]
    fn initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize(&conn).unwrap();
        initialize(&conn).unwrap();
    }
}
