//! Defines the `Category` type, its validation rules and its database
//! queries.
//!
//! A category is a named spending bucket with a monthly budget ceiling.
//! Expenses are recorded against a category and compared against its budget
//! by the [crate::analysis] module.

use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    database_id::CategoryId,
    money::Money,
    validation::{ValidationErrors, char_count},
};

// ============================================================================
// MODELS
// ============================================================================

/// The maximum number of characters in a category name.
pub const MAX_NAME_CHARS: usize = 100;

/// The maximum number of characters in a category description.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// The largest monthly budget a category may have.
pub fn max_monthly_budget() -> Money {
    Money::new(Decimal::new(99_999_999, 2))
}

/// A named spending bucket with a monthly budget ceiling, e.g. 'Groceries'
/// with a budget of $600.00.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The name of the category. Unique across all categories.
    pub name: String,
    /// A description of what spending belongs in this category.
    pub description: String,
    /// How much may be spent against this category each month.
    pub monthly_budget: Money,
}

/// Candidate attributes for creating or updating a category.
///
/// Fields left as `None` keep their previous value on update and count as
/// missing on creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryData {
    /// The name of the category.
    pub name: Option<String>,
    /// A description of what spending belongs in this category.
    pub description: Option<String>,
    /// How much may be spent against this category each month.
    pub monthly_budget: Option<Money>,
}

/// A set of category attributes that passed field validation.
///
/// Name uniqueness is enforced by the storage layer, not here, so that
/// concurrent creation of the same name yields exactly one success.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidCategory {
    /// The name of the category.
    pub name: String,
    /// A description of what spending belongs in this category.
    pub description: String,
    /// How much may be spent against this category each month.
    pub monthly_budget: Money,
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Validate candidate category attributes, merged over the previous state of
/// the category when updating.
///
/// All fields are checked independently; within a field only the first
/// failing rule is reported.
///
/// # Errors
/// Returns the per-field validation messages if any rule fails.
pub fn validate(
    data: &CategoryData,
    previous: Option<&Category>,
) -> Result<ValidCategory, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = data
        .name
        .as_deref()
        .or(previous.map(|category| category.name.as_str()));
    match name {
        None => errors.add("name", "can't be blank"),
        Some(name) if name.is_empty() => errors.add("name", "can't be blank"),
        Some(name) if char_count(name) > MAX_NAME_CHARS => {
            errors.add("name", format!("should be at most {MAX_NAME_CHARS} character(s)"));
        }
        Some(_) => {}
    }

    let description = data
        .description
        .as_deref()
        .or(previous.map(|category| category.description.as_str()));
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

    let monthly_budget = data
        .monthly_budget
        .or(previous.map(|category| category.monthly_budget));
    match monthly_budget {
        None => errors.add("monthly_budget", "can't be blank"),
        Some(budget) if !budget.is_positive() => {
            errors.add("monthly_budget", "must be greater than 0");
        }
        Some(budget) if budget.fractional_digits() > 2 => {
            errors.add("monthly_budget", "must have at most 2 decimal places");
        }
        Some(budget) if budget > max_monthly_budget() => {
            errors.add(
                "monthly_budget",
                format!("must be less than or equal to {}", max_monthly_budget()),
            );
        }
        Some(_) => {}
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ValidCategory {
        // The unwraps cannot fail: a missing field was reported above.
        name: name.map(str::to_owned).unwrap(),
        description: description.map(str::to_owned).unwrap(),
        monthly_budget: monthly_budget.unwrap(),
    })
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new category in the database from validated attributes.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] on `name` if the name is already taken,
/// - or [Error::Sql] if there is some other SQL error.
pub fn create_category(valid: &ValidCategory, connection: &Connection) -> Result<Category, Error> {
    let category = connection
        .prepare(
            "INSERT INTO category (name, description, monthly_budget)
             VALUES (?1, ?2, ?3)
             RETURNING id, name, description, monthly_budget",
        )?
        .query_one(
            (&valid.name, &valid.description, valid.monthly_budget),
            map_category_row,
        )?;

    Ok(category)
}

/// Retrieve a category from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid category,
/// - or [Error::Sql] if there is some other SQL error.
pub fn get_category(id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    let category = connection
        .prepare(
            "SELECT id, name, description, monthly_budget FROM category WHERE id = :id",
        )?
        .query_one(&[(":id", &id)], map_category_row)?;

    Ok(category)
}

/// Retrieve all categories from the database, ordered by name.
///
/// # Errors
/// This function will return an [Error::Sql] if there is an SQL error.
pub fn get_all_categories(connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT id, name, description, monthly_budget FROM category ORDER BY name")?
        .query_map([], map_category_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Overwrite the category `id` with validated attributes.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid category,
/// - [Error::Validation] on `name` if the new name is already taken,
/// - or [Error::Sql] if there is some other SQL error.
pub fn update_category(
    id: CategoryId,
    valid: &ValidCategory,
    connection: &Connection,
) -> Result<Category, Error> {
    let category = connection
        .prepare(
            "UPDATE category
             SET name = ?1, description = ?2, monthly_budget = ?3, updated_at = datetime('now')
             WHERE id = ?4
             RETURNING id, name, description, monthly_budget",
        )?
        .query_one(
            (&valid.name, &valid.description, valid.monthly_budget, id),
            map_category_row,
        )?;

    Ok(category)
}

/// Delete the category `id` from the database.
///
/// Expenses recorded against the category are deleted with it.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid category,
/// - or [Error::Sql] if there is some other SQL error.
pub fn delete_category(id: CategoryId, connection: &Connection) -> Result<(), Error> {
    let rows_deleted = connection.execute("DELETE FROM category WHERE id = ?1", (id,))?;

    if rows_deleted == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Create the category table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL,
                monthly_budget TEXT NOT NULL CHECK (CAST(monthly_budget AS REAL) > 0.0),
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Category.
pub fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let name = row.get(1)?;
    let description = row.get(2)?;
    let monthly_budget = row.get(3)?;

    Ok(Category {
        id,
        name,
        description,
        monthly_budget,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod validation_tests {
    use rust_decimal_macros::dec;

    use crate::money::Money;

    use super::{CategoryData, validate};

    fn valid_data() -> CategoryData {
        CategoryData {
            name: Some("Groceries".to_string()),
            description: Some("Food and household supplies".to_string()),
            monthly_budget: Some(Money::new(dec!(600.00))),
        }
    }

    #[test]
    fn validate_accepts_valid_data() {
        let result = validate(&valid_data(), None);

        match result {
            Ok(valid) => {
                assert_eq!(valid.name, "Groceries");
                assert_eq!(valid.monthly_budget, Money::new(dec!(600.00)));
            }
            Err(errors) => panic!("Unexpected validation errors: {errors}"),
        }
    }

    #[test]
    fn validate_rejects_missing_fields() {
        let errors = validate(&CategoryData::default(), None).unwrap_err();

        assert_eq!(errors.field("name"), Some(&["can't be blank".to_string()][..]));
        assert_eq!(
            errors.field("description"),
            Some(&["can't be blank".to_string()][..])
        );
        assert_eq!(
            errors.field("monthly_budget"),
            Some(&["can't be blank".to_string()][..])
        );
    }

    #[test]
    fn validate_rejects_overlong_name() {
        let data = CategoryData {
            name: Some("x".repeat(101)),
            ..valid_data()
        };

        let errors = validate(&data, None).unwrap_err();

        assert_eq!(
            errors.field("name"),
            Some(&["should be at most 100 character(s)".to_string()][..])
        );
    }

    #[test]
    fn validate_rejects_overlong_description() {
        let data = CategoryData {
            description: Some("x".repeat(501)),
            ..valid_data()
        };

        let errors = validate(&data, None).unwrap_err();

        assert!(errors.field("description").is_some());
    }

    #[test]
    fn validate_rejects_non_positive_budget() {
        for budget in [dec!(0), dec!(-10.00)] {
            let data = CategoryData {
                monthly_budget: Some(Money::new(budget)),
                ..valid_data()
            };

            let errors = validate(&data, None).unwrap_err();

            assert_eq!(
                errors.field("monthly_budget"),
                Some(&["must be greater than 0".to_string()][..])
            );
        }
    }

    #[test]
    fn validate_rejects_three_decimal_places() {
        let data = CategoryData {
            monthly_budget: Some(Money::new(dec!(123.456))),
            ..valid_data()
        };

        let errors = validate(&data, None).unwrap_err();

        assert_eq!(
            errors.field("monthly_budget"),
            Some(&["must have at most 2 decimal places".to_string()][..])
        );
    }

    #[test]
    fn validate_rejects_budget_over_maximum() {
        let data = CategoryData {
            monthly_budget: Some(Money::new(dec!(1000000.00))),
            ..valid_data()
        };

        let errors = validate(&data, None).unwrap_err();

        assert_eq!(
            errors.field("monthly_budget"),
            Some(&["must be less than or equal to 999999.99".to_string()][..])
        );
    }

    #[test]
    fn validate_merges_previous_state_on_update() {
        let previous = crate::category::Category {
            id: 1,
            name: "Groceries".to_string(),
            description: "Food".to_string(),
            monthly_budget: Money::new(dec!(600.00)),
        };
        let data = CategoryData {
            monthly_budget: Some(Money::new(dec!(750.00))),
            ..CategoryData::default()
        };

        let valid = validate(&data, Some(&previous)).unwrap();

        assert_eq!(valid.name, "Groceries");
        assert_eq!(valid.description, "Food");
        assert_eq!(valid.monthly_budget, Money::new(dec!(750.00)));
    }
}

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;

    use crate::{
        Error, db::initialize, money::Money, validation::ValidationErrors,
    };

    use super::{
        ValidCategory, create_category, delete_category, get_all_categories, get_category,
        update_category,
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn valid_category(name: &str) -> ValidCategory {
        ValidCategory {
            name: name.to_string(),
            description: "A test category".to_string(),
            monthly_budget: Money::new(dec!(500.00)),
        }
    }

    #[test]
    fn create_and_get_round_trips() {
        let conn = get_test_connection();

        let created = create_category(&valid_category("Groceries"), &conn).unwrap();
        let fetched = get_category(created.id, &conn);

        assert_eq!(fetched, Ok(created));
    }

    #[test]
    fn create_fails_on_duplicate_name() {
        let conn = get_test_connection();
        create_category(&valid_category("Groceries"), &conn).unwrap();

        let duplicate = create_category(&valid_category("Groceries"), &conn);

        assert_eq!(
            duplicate,
            Err(Error::Validation(ValidationErrors::single(
                "name",
                "has already been taken"
            )))
        );
    }

    #[test]
    fn get_with_invalid_id_returns_not_found() {
        let conn = get_test_connection();

        let result = get_category(999, &conn);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn get_all_returns_categories_ordered_by_name() {
        let conn = get_test_connection();
        create_category(&valid_category("Transport"), &conn).unwrap();
        create_category(&valid_category("Groceries"), &conn).unwrap();

        let names: Vec<String> = get_all_categories(&conn)
            .unwrap()
            .into_iter()
            .map(|category| category.name)
            .collect();

        assert_eq!(names, vec!["Groceries".to_string(), "Transport".to_string()]);
    }

    #[test]
    fn update_overwrites_fields() {
        let conn = get_test_connection();
        let created = create_category(&valid_category("Groceries"), &conn).unwrap();

        let updated = update_category(
            created.id,
            &ValidCategory {
                name: "Food".to_string(),
                description: "Renamed".to_string(),
                monthly_budget: Money::new(dec!(750.00)),
            },
            &conn,
        )
        .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Food");
        assert_eq!(updated.monthly_budget, Money::new(dec!(750.00)));
        assert_eq!(get_category(created.id, &conn), Ok(updated));
    }

    #[test]
    fn update_missing_category_returns_not_found() {
        let conn = get_test_connection();

        let result = update_category(999, &valid_category("Groceries"), &conn);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn delete_removes_category() {
        let conn = get_test_connection();
        let created = create_category(&valid_category("Groceries"), &conn).unwrap();

        delete_category(created.id, &conn).unwrap();

        assert_eq!(get_category(created.id, &conn), Err(Error::NotFound));
    }

    #[test]
    fn delete_missing_category_returns_not_found() {
        let conn = get_test_connection();

        assert_eq!(delete_category(999, &conn), Err(Error::NotFound));
    }
}
