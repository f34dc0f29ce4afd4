//! The category mutation service.
//!
//! Category CRUD follows the same commit-then-notify discipline as expense
//! mutations but never involves a budget check: budgets constrain expenses,
//! not the categories that define them.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::{
    Error, analysis,
    analysis::{BudgetAnalysis, CategoryAnalysis},
    category::{self, Category, CategoryData},
    database_id::CategoryId,
    events::{ChangeEvent, EventBus},
};

/// Creates, updates and deletes categories, and derives their budget
/// analyses.
///
/// Cloning is cheap; clones share the same database connection and event
/// bus.
#[derive(Debug, Clone)]
pub struct CategoryService {
    db_connection: Arc<Mutex<Connection>>,
    events: EventBus,
}

impl CategoryService {
    /// Create a category service over a shared database connection and event
    /// bus.
    pub fn new(db_connection: Arc<Mutex<Connection>>, events: EventBus) -> Self {
        Self {
            db_connection,
            events,
        }
    }

    /// Validate and persist a new category.
    ///
    /// Name uniqueness is enforced by the storage layer so that concurrent
    /// creation of the same name yields exactly one success. A
    /// [ChangeEvent::CategoryCreated] event is published after the commit
    /// succeeds.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::Validation] if a field rule fails or the name is taken,
    /// - or [Error::Sql] if there is some other SQL error.
    pub fn create_category(&self, data: &CategoryData) -> Result<Category, Error> {
        let valid = category::validate(data, None)?;

        let connection = self.lock()?;
        let created = category::create_category(&valid, &connection)?;
        drop(connection);

        tracing::debug!(category_id = created.id, "created category");
        self.events.publish(ChangeEvent::CategoryCreated(created.clone()));

        Ok(created)
    }

    /// Validate and persist changes to the category `id`.
    ///
    /// Candidate fields left as `None` keep their previous values; the
    /// merged attributes are re-validated in full. A
    /// [ChangeEvent::CategoryUpdated] event is published after the commit
    /// succeeds.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if `id` does not refer to a valid category,
    /// - [Error::Validation] if a field rule fails on the merged attributes
    ///   or the new name is taken,
    /// - or [Error::Sql] if there is some other SQL error.
    pub fn update_category(&self, id: CategoryId, data: &CategoryData) -> Result<Category, Error> {
        let mut connection = self.lock()?;
        let tx = connection.transaction()?;

        let previous = category::get_category(id, &tx)?;
        let valid = category::validate(data, Some(&previous))?;
        let updated = category::update_category(id, &valid, &tx)?;
        tx.commit()?;
        drop(connection);

        tracing::debug!(category_id = id, "updated category");
        self.events.publish(ChangeEvent::CategoryUpdated(updated.clone()));

        Ok(updated)
    }

    /// Delete the category `id` along with every expense recorded against
    /// it.
    ///
    /// A [ChangeEvent::CategoryDeleted] event is published after the commit
    /// succeeds.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if `id` does not refer to a valid category,
    /// - or [Error::Sql] if there is some other SQL error.
    pub fn delete_category(&self, id: CategoryId) -> Result<(), Error> {
        let connection = self.lock()?;
        category::delete_category(id, &connection)?;
        drop(connection);

        tracing::debug!(category_id = id, "deleted category");
        self.events.publish(ChangeEvent::CategoryDeleted { category_id: id });

        Ok(())
    }

    /// Retrieve the category `id`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if `id` does not refer to a valid category,
    /// - or [Error::Sql] if there is some other SQL error.
    pub fn get_category(&self, id: CategoryId) -> Result<Category, Error> {
        let connection = self.lock()?;

        category::get_category(id, &connection)
    }

    /// Retrieve all categories, ordered by name.
    ///
    /// # Errors
    /// This function will return an [Error::Sql] if there is an SQL error.
    pub fn list_categories(&self) -> Result<Vec<Category>, Error> {
        let connection = self.lock()?;

        category::get_all_categories(&connection)
    }

    /// Compute the current budget analysis for the category `id`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if `id` does not refer to a valid category,
    /// - or [Error::Sql] if there is some other SQL error.
    pub fn analyze(&self, id: CategoryId) -> Result<BudgetAnalysis, Error> {
        let connection = self.lock()?;

        analysis::analyze_category(id, &connection)
    }

    /// Compute the current budget analysis for every category, ordered by
    /// name.
    ///
    /// # Errors
    /// This function will return an [Error::Sql] if there is an SQL error.
    pub fn analyze_all(&self) -> Result<Vec<CategoryAnalysis>, Error> {
        let connection = self.lock()?;

        analysis::analyze_all(&connection)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.db_connection.lock().map_err(|_| Error::DatabaseLock)
    }
}

// ============================================================================
// TESTS
// ============================================================================
