use std::time::Duration;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EventRepository, RepositoryError};
use crate::models::Event;
use crate::utils::deadline::Deadline;

/// In-memory store used to drive the HTTP layer in tests.
#[derive(Default)]
pub struct MemoryEventRepository {
    events: RwLock<Vec<Event>>,
    delay: Option<Duration>,
    fail: bool,
}

impl MemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation sleeps this long before touching the data.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Every operation fails with a database error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    async fn round_trip(&self, context: &'static str) -> Result<(), RepositoryError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(RepositoryError::Database {
                context,
                source: sqlx::Error::PoolClosed,
            });
        }
        Ok(())
    }
}

impl EventRepository for MemoryEventRepository {
    async fn create(&self, deadline: Deadline, event: &Event) -> Result<(), RepositoryError> {
        deadline.run(self.round_trip("failed to create event")).await??;
        self.events.write().await.push(event.clone());
        Ok(())
    }

    async fn get_all(&self, deadline: Deadline) -> Result<Vec<Event>, RepositoryError> {
        deadline.run(self.round_trip("failed to query events")).await??;
        let mut events = self.events.read().await.clone();
        events.sort_by_key(|event| event.start_time);
        Ok(events)
    }

    async fn get_by_id(&self, deadline: Deadline, id: Uuid) -> Result<Event, RepositoryError> {
        deadline.run(self.round_trip("failed to get event")).await??;
        self.events
            .read()
            .await
            .iter()
            .find(|event| event.id == id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }
}
