//! A utility for creating a test database for the REST API server.

use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::OffsetDateTime;

use fintrack_rs::{PasswordHash, ValidatedPassword, create_user, initialize_db};

/// A utility for creating a test database for the REST API server of fintrack_rs.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test user...");

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked("test"),
        PasswordHash::DEFAULT_COST,
    )?;

    let user = create_user("test@test.com", password_hash, &conn)?;

    println!("Creating test data...");

    let today = OffsetDateTime::now_utc().date();

    conn.execute(
        "INSERT INTO \"transaction\" (user_id, type, category, amount, date, description, \
         payment_method, status, is_scheduled)
         VALUES
            (?1, 'income', 'Salary', 2500.0, ?2, 'Monthly pay', 'Bank-Transfer', 'completed', 0),
            (?1, 'expense', 'Housing', 800.0, ?2, 'Rent', 'Bank-Transfer', 'completed', 0),
            (?1, 'expense', 'Food', 120.5, ?2, 'Groceries', 'Card', 'completed', 0)",
        (user.id.as_i64(), today),
    )?;

    conn.execute(
        "INSERT INTO goal (user_id, name, type, target_amount, progress, status)
         VALUES (?1, 'Holiday fund', 'saving', 3000.0, 0.0, 'active')",
        (user.id.as_i64(),),
    )?;

    conn.execute(
        "INSERT INTO scheduled_transaction (user_id, description, amount, type, category, \
         payment_method, frequency, start_date, status, next_execution)
         VALUES (?1, 'Rent', 800.0, 'expense', 'Housing', 'Bank-Transfer', 'monthly', ?2, \
         'active', ?2)",
        (user.id.as_i64(), today),
    )?;

    println!("Success!");

    Ok(())
}
