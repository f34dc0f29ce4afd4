//! Outlay is the core of a budget-tracking application: users define
//! spending categories with monthly budgets, record expenses against them
//! and watch utilization.
//!
//! The crate owns the budget analysis engine, the transactional expense
//! mutation services and the change notification bus. The HTTP/UI layer,
//! receipt image processing and the durable job queue are external
//! collaborators that consume this crate as a library.

#![warn(missing_docs)]

pub mod analysis;
mod app_state;
pub mod category;
mod database_id;
pub mod db;
mod error;
pub mod events;
pub mod expense;
pub mod matcher;
pub mod money;
pub mod service;
pub mod validation;

pub use app_state::AppState;
pub use database_id::{CategoryId, DatabaseId, ExpenseId};
pub use error::Error;

pub use analysis::{BudgetAnalysis, BudgetStatus, ProjectedAnalysis, analyze, project_impact};
pub use category::{Category, CategoryData};
pub use events::{ChangeEvent, EventBus};
pub use expense::{Expense, ExpenseData};
pub use matcher::{CategoryMatch, match_category};
pub use money::Money;
pub use service::{BudgetCheck, CategoryService, ExpenseService};
pub use validation::ValidationErrors;
