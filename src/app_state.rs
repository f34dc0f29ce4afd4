//! Implements a struct that wires the database connection, event bus and
//! mutation services together for an embedding application.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    Error,
    db::initialize,
    events::EventBus,
    service::{CategoryService, ExpenseService},
};

/// The shared state of the application core.
///
/// Holds the single database connection and the lifecycle-scoped event bus,
/// and hands out the services that operate on them. Created once at
/// application start and cloned into whatever needs it; all clones share the
/// same connection and bus.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,

    /// The change notification bus shared by the services and UI sessions.
    pub events: EventBus,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for
    /// the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_connection: Connection) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
            events: EventBus::default(),
        })
    }

    /// A category service sharing this state's connection and event bus.
    pub fn category_service(&self) -> CategoryService {
        CategoryService::new(self.db_connection.clone(), self.events.clone())
    }

    /// An expense service sharing this state's connection and event bus.
    pub fn expense_service(&self) -> ExpenseService {
        ExpenseService::new(self.db_connection.clone(), self.events.clone())
    }
}
