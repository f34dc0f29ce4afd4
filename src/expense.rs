//! Defines the `Expense` type, its validation rules and its database
//! queries.
//!
//! An expense is a single dated monetary transaction attributed to exactly
//! one category. Expenses are only ever written through
//! [crate::service::ExpenseService] so that validation and budget checks
//! cannot be bypassed.

use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    database_id::{CategoryId, ExpenseId},
    money::Money,
    validation::{ValidationErrors, char_count, shift_years, today},
};

// ============================================================================
// MODELS
// ============================================================================

/// The maximum number of characters in an expense description.
pub const MAX_DESCRIPTION_CHARS: usize = 255;

/// The maximum number of characters in expense notes.
pub const MAX_NOTES_CHARS: usize = 1000;

/// The largest amount a single expense may have.
pub fn max_amount() -> Money {
    Money::new(Decimal::new(9_999_999_999, 2))
}

/// A single dated monetary transaction attributed to one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Expense {
    /// The ID of the expense.
    pub id: ExpenseId,
    /// A text description of what the expense was for.
    pub description: String,
    /// The amount of money spent. Always strictly positive.
    pub amount: Money,
    /// When the expense happened.
    pub date: Date,
    /// Free-form notes about the expense.
    pub notes: String,
    /// The ID of the category the expense is recorded against.
    pub category_id: CategoryId,
}

/// Candidate attributes for creating or updating an expense.
///
/// Fields left as `None` keep their previous value on update and count as
/// missing on creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseData {
    /// A text description of what the expense was for.
    pub description: Option<String>,
    /// The amount of money spent.
    pub amount: Option<Money>,
    /// When the expense happened.
    pub date: Option<Date>,
    /// Free-form notes about the expense.
    pub notes: Option<String>,
    /// The ID of the category the expense is recorded against.
    pub category_id: Option<CategoryId>,
}

/// A set of expense attributes that passed field validation.
///
/// The referential check that `category_id` points at an existing category is
/// enforced by the storage layer inside the mutation transaction, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidExpense {
    /// A text description of what the expense was for.
    pub description: String,
    /// The amount of money spent.
    pub amount: Money,
    /// When the expense happened.
    pub date: Date,
    /// Free-form notes about the expense.
    pub notes: String,
    /// The ID of the category the expense is recorded against.
    pub category_id: CategoryId,
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Validate candidate expense attributes, merged over the previous state of
/// the expense when updating.
///
/// All fields are checked independently; within a field only the first
/// failing rule is reported. Dates must lie within ten years in the past and
/// one year in the future of the current date.
///
/// # Errors
/// Returns the per-field validation messages if any rule fails.
pub fn validate(
    data: &ExpenseData,
    previous: Option<&Expense>,
) -> Result<ValidExpense, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let description = data
        .description
        .as_deref()
        .or(previous.map(|expense| expense.description.as_str()));
    match description {
        None => errors.add("description", "can't be blank"),
        Some(description) if description.is_empty() => errors.add("description", "can't be blank"),
        Some(description) if char_count(description) > MAX_DESCRIPTION_CHARS => {
            errors.add(
                "description",
                format!("should be at most {MAX_DESCRIPTION_CHARS} character(s)"),
            );
        }
        Some(_) => {}
    }

    let amount = data.amount.or(previous.map(|expense| expense.amount));
    match amount {
        None => errors.add("amount", "can't be blank"),
        Some(amount) if !amount.is_positive() => errors.add("amount", "must be greater than 0"),
        Some(amount) if amount.fractional_digits() > 2 => {
            errors.add("amount", "must have at most 2 decimal places");
        }
        Some(amount) if amount > max_amount() => {
            errors.add("amount", format!("must be less than or equal to {}", max_amount()));
        }
        Some(_) => {}
    }

    let date = data.date.or(previous.map(|expense| expense.date));
    let today = today();
    match date {
        None => errors.add("date", "can't be blank"),
        Some(date) if date < shift_years(today, -10) => {
            errors.add("date", "must be within the last 10 years");
        }
        Some(date) if date > shift_years(today, 1) => {
            errors.add("date", "cannot be more than 1 year in the future");
        }
        Some(_) => {}
    }

    let notes = data
        .notes
        .as_deref()
        .or(previous.map(|expense| expense.notes.as_str()));
    match notes {
        None => errors.add("notes", "can't be blank"),
        Some(notes) if notes.is_empty() => errors.add("notes", "can't be blank"),
        Some(notes) if char_count(notes) > MAX_NOTES_CHARS => {
            errors.add("notes", format!("should be at most {MAX_NOTES_CHARS} character(s)"));
        }
        Some(_) => {}
    }

    let category_id = data
        .category_id
        .or(previous.map(|expense| expense.category_id));
    if category_id.is_none() {
        errors.add("category_id", "can't be blank");
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ValidExpense {
        // The unwraps cannot fail: a missing field was reported above.
        description: description.map(str::to_owned).unwrap(),
        amount: amount.unwrap(),
        date: date.unwrap(),
        notes: notes.map(str::to_owned).unwrap(),
        category_id: category_id.unwrap(),
    })
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new expense in the database from validated attributes.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] on `category_id` if the category does not exist,
/// - or [Error::Sql] if there is some other SQL error.
pub fn create_expense(valid: &ValidExpense, connection: &Connection) -> Result<Expense, Error> {
    let expense = connection
        .prepare(
            "INSERT INTO expense (description, amount, date, notes, category_id)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, description, amount, date, notes, category_id",
        )?
        .query_one(
            (
                &valid.description,
                valid.amount,
                valid.date,
                &valid.notes,
                valid.category_id,
            ),
            map_expense_row,
        )?;

    Ok(expense)
}

/// Retrieve an expense from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid expense,
/// - or [Error::Sql] if there is some other SQL error.
pub fn get_expense(id: ExpenseId, connection: &Connection) -> Result<Expense, Error> {
    let expense = connection
        .prepare(
            "SELECT id, description, amount, date, notes, category_id
             FROM expense WHERE id = :id",
        )?
        .query_one(&[(":id", &id)], map_expense_row)?;

    Ok(expense)
}

/// Retrieve all expenses recorded against the category `category_id`, most
/// recent first.
///
/// # Errors
/// This function will return an [Error::Sql] if there is an SQL error.
pub fn get_expenses_by_category(
    category_id: CategoryId,
    connection: &Connection,
) -> Result<Vec<Expense>, Error> {
    connection
        .prepare(
            "SELECT id, description, amount, date, notes, category_id
             FROM expense WHERE category_id = :category_id
             ORDER BY date DESC, id DESC",
        )?
        .query_map(&[(":category_id", &category_id)], map_expense_row)?
        .map(|maybe_expense| maybe_expense.map_err(|error| error.into()))
        .collect()
}

/// Overwrite the expense `id` with validated attributes.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid expense,
/// - [Error::Validation] on `category_id` if the new category does not exist,
/// - or [Error::Sql] if there is some other SQL error.
pub fn update_expense(
    id: ExpenseId,
    valid: &ValidExpense,
    connection: &Connection,
) -> Result<Expense, Error> {
    let expense = connection
        .prepare(
            "UPDATE expense
             SET description = ?1, amount = ?2, date = ?3, notes = ?4, category_id = ?5,
                 updated_at = datetime('now')
             WHERE id = ?6
             RETURNING id, description, amount, date, notes, category_id",
        )?
        .query_one(
            (
                &valid.description,
                valid.amount,
                valid.date,
                &valid.notes,
                valid.category_id,
                id,
            ),
            map_expense_row,
        )?;

    Ok(expense)
}

/// Delete the expense `id` from the database.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid expense,
/// - or [Error::Sql] if there is some other SQL error.
pub fn delete_expense(id: ExpenseId, connection: &Connection) -> Result<(), Error> {
    let rows_deleted = connection.execute("DELETE FROM expense WHERE id = ?1", (id,))?;

    if rows_deleted == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Create the expense table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS expense (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                description TEXT NOT NULL,
                amount TEXT NOT NULL CHECK (CAST(amount AS REAL) > 0.0),
                date TEXT NOT NULL,
                notes TEXT NOT NULL,
                category_id INTEGER NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY(category_id) REFERENCES category(id) ON DELETE CASCADE
                )",
        (),
    )?;

    // Index used by the budget analysis read of a category's expenses.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_expense_category ON expense(category_id, date);",
        (),
    )?;

    Ok(())
}

/// Map a database row to an Expense.
pub fn map_expense_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    let id = row.get(0)?;
    let description = row.get(1)?;
    let amount = row.get(2)?;
    let date = row.get(3)?;
    let notes = row.get(4)?;
    let category_id = row.get(5)?;

    Ok(Expense {
        id,
        description,
        amount,
        date,
        notes,
        category_id,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod validation_tests {
    use rust_decimal_macros::dec;
    use time::Duration;

    use crate::{money::Money, validation::today};

    use super::{ExpenseData, validate};

    fn valid_data() -> ExpenseData {
        ExpenseData {
            description: Some("Weekly shop".to_string()),
            amount: Some(Money::new(dec!(82.50))),
            date: Some(today()),
            notes: Some("Countdown".to_string()),
            category_id: Some(1),
        }
    }

    #[test]
    fn validate_accepts_valid_data() {
        let result = validate(&valid_data(), None);

        match result {
            Ok(valid) => assert_eq!(valid.amount, Money::new(dec!(82.50))),
            Err(errors) => panic!("Unexpected validation errors: {errors}"),
        }
    }

    #[test]
    fn validate_rejects_missing_fields() {
        let errors = validate(&ExpenseData::default(), None).unwrap_err();

        for field in ["description", "amount", "date", "notes", "category_id"] {
            assert_eq!(
                errors.field(field),
                Some(&["can't be blank".to_string()][..]),
                "missing message for {field}"
            );
        }
    }

    #[test]
    fn validate_rejects_three_decimal_places() {
        let data = ExpenseData {
            amount: Some(Money::new(dec!(123.456))),
            ..valid_data()
        };

        let errors = validate(&data, None).unwrap_err();

        assert_eq!(
            errors.field("amount"),
            Some(&["must have at most 2 decimal places".to_string()][..])
        );
    }

    #[test]
    fn validate_rejects_amount_over_maximum() {
        let data = ExpenseData {
            amount: Some(Money::new(dec!(100000000.00))),
            ..valid_data()
        };

        let errors = validate(&data, None).unwrap_err();

        assert_eq!(
            errors.field("amount"),
            Some(&["must be less than or equal to 99999999.99".to_string()][..])
        );
    }

    #[test]
    fn validate_rejects_non_positive_amount() {
        let data = ExpenseData {
            amount: Some(Money::new(dec!(0.00))),
            ..valid_data()
        };

        let errors = validate(&data, None).unwrap_err();

        assert_eq!(
            errors.field("amount"),
            Some(&["must be greater than 0".to_string()][..])
        );
    }

    #[test]
    fn validate_rejects_date_400_days_in_future() {
        let data = ExpenseData {
            date: Some(today() + Duration::days(400)),
            ..valid_data()
        };

        let errors = validate(&data, None).unwrap_err();

        assert_eq!(
            errors.field("date"),
            Some(&["cannot be more than 1 year in the future".to_string()][..])
        );
    }

    #[test]
    fn validate_rejects_date_4000_days_in_past() {
        let data = ExpenseData {
            date: Some(today() - Duration::days(4000)),
            ..valid_data()
        };

        let errors = validate(&data, None).unwrap_err();

        assert_eq!(
            errors.field("date"),
            Some(&["must be within the last 10 years".to_string()][..])
        );
    }

    #[test]
    fn validate_rejects_256_character_description() {
        let data = ExpenseData {
            description: Some("x".repeat(256)),
            ..valid_data()
        };

        let errors = validate(&data, None).unwrap_err();

        assert_eq!(
            errors.field("description"),
            Some(&["should be at most 255 character(s)".to_string()][..])
        );
    }

    #[test]
    fn validate_reports_all_invalid_fields_independently() {
        let data = ExpenseData {
            description: Some("".to_string()),
            amount: Some(Money::new(dec!(-1))),
            ..valid_data()
        };

        let errors = validate(&data, None).unwrap_err();

        assert!(errors.field("description").is_some());
        assert!(errors.field("amount").is_some());
        assert!(errors.field("date").is_none());
    }

    #[test]
    fn validate_merges_previous_state_on_update() {
        let previous = crate::expense::Expense {
            id: 1,
            description: "Weekly shop".to_string(),
            amount: Money::new(dec!(82.50)),
            date: today(),
            notes: "Countdown".to_string(),
            category_id: 1,
        };
        let data = ExpenseData {
            amount: Some(Money::new(dec!(90.00))),
            ..ExpenseData::default()
        };

        let valid = validate(&data, Some(&previous)).unwrap();

        assert_eq!(valid.description, "Weekly shop");
        assert_eq!(valid.amount, Money::new(dec!(90.00)));
        assert_eq!(valid.category_id, 1);
    }
}
