//! Transactional mutation services for categories and expenses.
//!
//! All writes go through these services so that validation, the optional
//! budget-impact check and persistence happen inside a single all-or-nothing
//! transaction, and so that change events are only published after a
//! successful commit.

mod category;
mod expense;

pub use category::CategoryService;
pub use expense::{BudgetCheck, ExpenseService};
