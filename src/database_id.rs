//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;

/// The ID of a spending category.
pub type CategoryId = DatabaseId;

/// The ID of an expense.
pub type ExpenseId = DatabaseId;
