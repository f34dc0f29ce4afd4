//! The transactional expense mutation service.
//!
//! Each mutation runs as `validate -> (budget check) -> persist -> commit ->
//! notify`, with a rollback from any step before commit. The budget check and
//! the write happen inside the same database transaction so no other mutation
//! on this connection can commit between the check and the write. Two
//! mutations on independent connections could still each pass their own check
//! and jointly exceed the budget; that window is an accepted trade-off of
//! computing totals from the expense rows rather than locking a stored
//! aggregate.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::{
    Error, analysis, category,
    database_id::{CategoryId, ExpenseId},
    events::{ChangeEvent, EventBus},
    expense::{self, Expense, ExpenseData},
    money::Money,
    validation::ValidationErrors,
};

/// Whether a mutation should be vetoed when it would push the category over
/// its monthly budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetCheck {
    /// Reject the mutation with [Error::BudgetExceeded] if the projected
    /// utilization is strictly above 100%.
    Enforce,
    /// Persist the mutation regardless of the budget.
    Skip,
}

/// Creates, updates and deletes expenses inside all-or-nothing transactions.
///
/// Cloning is cheap; clones share the same database connection and event
/// bus.
#[derive(Debug, Clone)]
pub struct ExpenseService {
    db_connection: Arc<Mutex<Connection>>,
    events: EventBus,
}

impl ExpenseService {
    /// Create an expense service over a shared database connection and event
    /// bus.
    pub fn new(db_connection: Arc<Mutex<Connection>>, events: EventBus) -> Self {
        Self {
            db_connection,
            events,
        }
    }

    /// Validate and persist a new expense.
    ///
    /// With [BudgetCheck::Enforce], the expense is vetoed if adding its
    /// amount to the category's current total would push utilization strictly
    /// above 100%; the veto happens inside the same transaction as the write,
    /// and nothing is persisted.
    ///
    /// A [ChangeEvent::ExpenseCreated] event is published after the commit
    /// succeeds, never before.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::Validation] if a field rule fails or the category does not
    ///   exist,
    /// - [Error::BudgetExceeded] if the budget check vetoed the expense,
    /// - or [Error::Sql] if there is some other SQL error.
    pub fn create_expense(
        &self,
        data: &ExpenseData,
        budget_check: BudgetCheck,
    ) -> Result<Expense, Error> {
        let mut connection = self.lock()?;
        let tx = connection.transaction()?;

        let valid = expense::validate(data, None)?;
        let category = get_referenced_category(valid.category_id, &tx)?;

        if budget_check == BudgetCheck::Enforce {
            let expenses = expense::get_expenses_by_category(category.id, &tx)?;
            let projection = analysis::project_impact(valid.amount, &category, &expenses);

            if projection.would_exceed {
                tracing::debug!(
                    category_id = category.id,
                    projected_percentage = projection.projected.percentage,
                    "vetoed expense creation over budget"
                );
                return Err(Error::BudgetExceeded(projection));
            }
        }

        let created = expense::create_expense(&valid, &tx)?;
        tx.commit()?;
        drop(connection);

        tracing::debug!(expense_id = created.id, "created expense");
        self.events.publish(ChangeEvent::ExpenseCreated(created.clone()));

        Ok(created)
    }

    /// Validate and persist changes to the expense `id`.
    ///
    /// Candidate fields left as `None` keep their previous values. With
    /// [BudgetCheck::Enforce] and a changed amount, the budget check runs
    /// against the net change `new_amount - old_amount` rather than the
    /// absolute new amount: the old amount is already counted in the
    /// category's current total, so re-checking the full new amount would
    /// double-count it. Changes that leave the amount untouched never trigger
    /// a budget veto.
    ///
    /// A [ChangeEvent::ExpenseUpdated] event is published after the commit
    /// succeeds.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if `id` does not refer to a valid expense,
    /// - [Error::Validation] if a field rule fails on the merged attributes,
    /// - [Error::BudgetExceeded] if the budget check vetoed the change,
    /// - or [Error::Sql] if there is some other SQL error.
    pub fn update_expense(
        &self,
        id: ExpenseId,
        data: &ExpenseData,
        budget_check: BudgetCheck,
    ) -> Result<Expense, Error> {
        let mut connection = self.lock()?;
        let tx = connection.transaction()?;

        let previous = expense::get_expense(id, &tx)?;
        let valid = expense::validate(data, Some(&previous))?;

        if budget_check == BudgetCheck::Enforce && valid.amount != previous.amount {
            let delta = valid.amount - previous.amount;
            let category = get_referenced_category(valid.category_id, &tx)?;
            let expenses = expense::get_expenses_by_category(category.id, &tx)?;
            let projection = analysis::project_impact(delta, &category, &expenses);

            if projection.would_exceed {
                tracing::debug!(
                    expense_id = id,
                    category_id = category.id,
                    projected_percentage = projection.projected.percentage,
                    "vetoed expense update over budget"
                );
                return Err(Error::BudgetExceeded(projection));
            }
        }

        let updated = expense::update_expense(id, &valid, &tx)?;
        tx.commit()?;
        drop(connection);

        tracing::debug!(expense_id = id, "updated expense");
        self.events.publish(ChangeEvent::ExpenseUpdated(updated.clone()));

        Ok(updated)
    }

    /// Delete the expense `id`.
    ///
    /// A [ChangeEvent::ExpenseDeleted] event is published after the commit
    /// succeeds.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if `id` does not refer to a valid expense,
    /// - or [Error::Sql] if there is some other SQL error.
    pub fn delete_expense(&self, id: ExpenseId) -> Result<(), Error> {
        let mut connection = self.lock()?;
        let tx = connection.transaction()?;

        let previous = expense::get_expense(id, &tx)?;
        expense::delete_expense(id, &tx)?;
        tx.commit()?;
        drop(connection);

        tracing::debug!(expense_id = id, "deleted expense");
        self.events.publish(ChangeEvent::ExpenseDeleted {
            expense_id: id,
            category_id: previous.category_id,
        });

        Ok(())
    }

    /// Retrieve the expense `id`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if `id` does not refer to a valid expense,
    /// - or [Error::Sql] if there is some other SQL error.
    pub fn get_expense(&self, id: ExpenseId) -> Result<Expense, Error> {
        let connection = self.lock()?;

        expense::get_expense(id, &connection)
    }

    /// Retrieve all expenses recorded against the category `category_id`,
    /// most recent first.
    ///
    /// # Errors
    /// This function will return an [Error::Sql] if there is an SQL error.
    pub fn expenses_for_category(&self, category_id: CategoryId) -> Result<Vec<Expense>, Error> {
        let connection = self.lock()?;

        expense::get_expenses_by_category(category_id, &connection)
    }

    /// Compute a hypothetical analysis for adding `candidate_amount` to the
    /// category `category_id`, without persisting anything.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if `category_id` does not refer to a valid
    ///   category,
    /// - or [Error::Sql] if there is some other SQL error.
    pub fn project_impact(
        &self,
        candidate_amount: Money,
        category_id: CategoryId,
    ) -> Result<analysis::ProjectedAnalysis, Error> {
        let connection = self.lock()?;

        analysis::project_for_category(candidate_amount, category_id, &connection)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.db_connection.lock().map_err(|_| Error::DatabaseLock)
    }
}

/// Fetch the category an expense refers to, surfacing a missing category as a
/// field error on `category_id` rather than a bare not-found.
fn get_referenced_category(
    category_id: CategoryId,
    connection: &Connection,
) -> Result<category::Category, Error> {
    category::get_category(category_id, connection).map_err(|error| match error {
        Error::NotFound => {
            Error::Validation(ValidationErrors::single("category_id", "does not exist"))
        }
        other => other,
    })
}

// ============================================================================
// TESTS
// ============================================================================
