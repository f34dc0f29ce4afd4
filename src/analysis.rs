//! The budget analysis engine.
//!
//! Computes spending-versus-budget utilization for a category: the exact
//! total spent, the utilization percentage, a status tier and the overage or
//! remainder. All arithmetic happens in exact decimals; the one float
//! conversion is the final percentage rounding.
//!
//! Analyses are derived values. They are recomputed on demand from current
//! storage state and never cached: a [crate::events::ChangeEvent] is a hint
//! to re-run the analysis, not a source of truth.

use rusqlite::Connection;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    category::{Category, get_all_categories, get_category},
    database_id::CategoryId,
    expense::{Expense, get_expenses_by_category},
    money::Money,
};

/// How close a category is to its monthly budget.
///
/// Determined by the utilization percentage: below 75% is `Good`, then
/// `Caution` below 90%, `Warning` below 100% and `OverBudget` at or above
/// 100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    /// Utilization below 75%.
    Good,
    /// Utilization at or above 75%.
    Caution,
    /// Utilization at or above 90%.
    Warning,
    /// Utilization at or above 100%.
    OverBudget,
}

impl BudgetStatus {
    /// The status tier for a utilization `percentage`.
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 100.0 {
            BudgetStatus::OverBudget
        } else if percentage >= 90.0 {
            BudgetStatus::Warning
        } else if percentage >= 75.0 {
            BudgetStatus::Caution
        } else {
            BudgetStatus::Good
        }
    }
}

/// The spending-versus-budget utilization of a category at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetAnalysis {
    /// The sum of the category's expense amounts, rounded to 2 decimal
    /// places.
    pub total_expenses: Money,
    /// The category's monthly budget, rounded to 2 decimal places.
    pub budget: Money,
    /// `total / budget * 100` rounded to 1 decimal place, or `0.0` when the
    /// budget is not positive.
    pub percentage: f64,
    /// The status tier for `percentage`.
    pub status: BudgetStatus,
    /// How far the total exceeds the budget, or zero.
    pub over_budget_amount: Money,
    /// How much budget is left, or zero.
    pub remaining_budget: Money,
}

/// A hypothetical budget analysis as if a candidate amount had been added to
/// a category's current total. Used to veto a mutation before commit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedAnalysis {
    /// The amount the projection adds to the current total.
    pub candidate_amount: Money,
    /// The analysis as it would look after adding the candidate amount.
    pub projected: BudgetAnalysis,
    /// Whether the projected percentage is strictly above 100%.
    pub would_exceed: bool,
}

/// A category paired with its current budget analysis, as displayed on a
/// dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryAnalysis {
    /// The analyzed category.
    pub category: Category,
    /// The category's current analysis.
    pub analysis: BudgetAnalysis,
}

/// Compute the budget analysis for `category` over `expenses`.
///
/// Deterministic and side-effect free: the same inputs always produce the
/// same analysis.
pub fn analyze(category: &Category, expenses: &[Expense]) -> BudgetAnalysis {
    let total = expenses.iter().map(|expense| expense.amount).sum();

    build_analysis(category.monthly_budget, total)
}

/// Compute a hypothetical analysis as if `candidate_amount` were added to the
/// total of `expenses`, without persisting anything.
///
/// The candidate amount may be negative, in which case the projection is for
/// a reduction of the current total (used for delta-based update checks).
pub fn project_impact(
    candidate_amount: Money,
    category: &Category,
    expenses: &[Expense],
) -> ProjectedAnalysis {
    let current_total: Money = expenses.iter().map(|expense| expense.amount).sum();
    let projected = build_analysis(category.monthly_budget, current_total + candidate_amount);

    ProjectedAnalysis {
        candidate_amount,
        projected,
        would_exceed: projected.percentage > 100.0,
    }
}

/// Compute the current budget analysis for the category `category_id` from
/// storage state.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `category_id` does not refer to a valid category,
/// - or [Error::Sql] if there is some other SQL error.
pub fn analyze_category(
    category_id: CategoryId,
    connection: &Connection,
) -> Result<BudgetAnalysis, Error> {
    let category = get_category(category_id, connection)?;
    let expenses = get_expenses_by_category(category_id, connection)?;

    Ok(analyze(&category, &expenses))
}

/// Compute the current budget analysis for every category, ordered by
/// category name.
///
/// # Errors
/// This function will return an [Error::Sql] if there is an SQL error.
pub fn analyze_all(connection: &Connection) -> Result<Vec<CategoryAnalysis>, Error> {
    get_all_categories(connection)?
        .into_iter()
        .map(|category| {
            let expenses = get_expenses_by_category(category.id, connection)?;
            let analysis = analyze(&category, &expenses);

            Ok(CategoryAnalysis { category, analysis })
        })
        .collect()
}

/// Compute a hypothetical analysis for adding `candidate_amount` to the
/// category `category_id`, from storage state.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `category_id` does not refer to a valid category,
/// - or [Error::Sql] if there is some other SQL error.
pub fn project_for_category(
    candidate_amount: Money,
    category_id: CategoryId,
    connection: &Connection,
) -> Result<ProjectedAnalysis, Error> {
    let category = get_category(category_id, connection)?;
    let expenses = get_expenses_by_category(category_id, connection)?;

    Ok(project_impact(candidate_amount, &category, &expenses))
}

fn build_analysis(budget: Money, total: Money) -> BudgetAnalysis {
    let total = total.round2();
    let budget = budget.round2();

    let percentage = if budget.is_positive() {
        let ratio = total.as_decimal() / budget.as_decimal() * Decimal::ONE_HUNDRED;

        ratio
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
            .to_f64()
            .unwrap_or(0.0)
    } else {
        0.0
    };

    let over_budget_amount = if total > budget {
        (total - budget).round2()
    } else {
        Money::ZERO
    };

    let remaining_budget = if budget > total {
        (budget - total).round2()
    } else {
        Money::ZERO
    };

    BudgetAnalysis {
        total_expenses: total,
        budget,
        percentage,
        status: BudgetStatus::from_percentage(percentage),
        over_budget_amount,
        remaining_budget,
    }
}

// ============================================================================
// TESTS
// ============================================================================
