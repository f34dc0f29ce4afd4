//! Database initialization.

use rusqlite::Connection;

use crate::{category::create_category_table, expense::create_expense_table};

/// Initialize the database, creating the tables for the domain models if
/// they do not exist.
///
/// Foreign key enforcement is enabled on the connection; SQLite leaves it off
/// by default.
///
/// # Errors
/// Returns an error if a table cannot be created or if there is an SQL
/// error.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.pragma_update(None, "foreign_keys", true)?;

    create_category_table(connection)?;
    create_expense_table(connection)?;

    Ok(())
}
