//! Defines the app level error type and the mapping from SQLite failures to
//! domain errors.

use crate::{analysis::ProjectedAnalysis, validation::ValidationErrors};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// One or more field-level validation rules were violated.
    ///
    /// Always recoverable: the caller should re-render with the per-field
    /// messages and let the user correct their input.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// The mutation was vetoed because it would push the category over its
    /// monthly budget.
    ///
    /// Carries the projected analysis so the caller can display how far over
    /// budget the mutation would have put the category. Nothing was
    /// persisted.
    #[error("the mutation would put the category at {:.1}% of its monthly budget", .0.projected.percentage)]
    BudgetExceeded(ProjectedAnalysis),

    /// The requested resource could not be found.
    ///
    /// Callers should check that the ID is correct and that the resource has
    /// not been deleted concurrently.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Could not acquire the database lock because another thread panicked
    /// while holding it.
    #[error("could not acquire the database lock")]
    DatabaseLock,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    Sql(rusqlite::Error),
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Error::Validation(errors)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // A FOREIGN KEY failure means the referenced category vanished,
            // which is surfaced as a field error rather than a crash.
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::Validation(ValidationErrors::single("category_id", "does not exist")),
            // Category names are unique at the storage layer so that
            // concurrent creation of the same name yields exactly one
            // success.
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                Some(ref description),
            ) if description.ends_with("category.name") => {
                Error::Validation(ValidationErrors::single("name", "has already been taken"))
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::Sql(error)
            }
        }
    }
}
