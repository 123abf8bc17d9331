use std::sync::Arc;

use crate::db::Database;

/// Shared by every request handler.
pub struct AppState<R> {
    pub events: Arc<R>,
    pub database: Arc<Database>,
}

impl<R> AppState<R> {
    pub fn new(events: R, database: Arc<Database>) -> Self {
        Self {
            events: Arc::new(events),
            database,
        }
    }
}

// Derived Clone would require `R: Clone`
impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
            database: Arc::clone(&self.database),
        }
    }
}
