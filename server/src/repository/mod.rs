use std::future::Future;

use thiserror::Error;
use uuid::Uuid;

use crate::models::Event;
use crate::utils::deadline::{Deadline, DeadlineExceeded};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgEventRepository;

/// Store-level failures. The store attaches context to low-level causes but
/// leaves HTTP semantics to the caller.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("event not found")]
    NotFound,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("{context}")]
    Database {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl RepositoryError {
    pub fn database(context: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| RepositoryError::Database { context, source }
    }
}

impl From<DeadlineExceeded> for RepositoryError {
    fn from(_: DeadlineExceeded) -> Self {
        RepositoryError::DeadlineExceeded
    }
}

/// Persistence for events. Every operation is a single round trip bounded by
/// the caller's deadline.
pub trait EventRepository: Send + Sync + 'static {
    fn create(
        &self,
        deadline: Deadline,
        event: &Event,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// All events ordered by `start_time` ascending.
    fn get_all(
        &self,
        deadline: Deadline,
    ) -> impl Future<Output = Result<Vec<Event>, RepositoryError>> + Send;

    fn get_by_id(
        &self,
        deadline: Deadline,
        id: Uuid,
    ) -> impl Future<Output = Result<Event, RepositoryError>> + Send;
}
