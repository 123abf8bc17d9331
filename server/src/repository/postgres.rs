use sqlx::PgPool;
use uuid::Uuid;

use super::{EventRepository, RepositoryError};
use crate::models::Event;
use crate::utils::deadline::Deadline;

const INSERT_EVENT: &str = r#"
    INSERT INTO events (id, title, description, start_time, end_time, created_at)
    VALUES ($1, $2, $3, $4, $5, $6)
"#;

const SELECT_ALL_EVENTS: &str = r#"
    SELECT id, title, description, start_time, end_time, created_at
    FROM events
    ORDER BY start_time ASC
"#;

const SELECT_EVENT_BY_ID: &str = r#"
    SELECT id, title, description, start_time, end_time, created_at
    FROM events
    WHERE id = $1
"#;

#[derive(Clone)]
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl EventRepository for PgEventRepository {
    async fn create(&self, deadline: Deadline, event: &Event) -> Result<(), RepositoryError> {
        let insert = sqlx::query(INSERT_EVENT)
            .bind(event.id)
            .bind(&event.title)
            .bind(&event.description)
            .bind(event.start_time)
            .bind(event.end_time)
            .bind(event.created_at)
            .execute(&self.pool);

        deadline
            .run(insert)
            .await?
            .map_err(RepositoryError::database("failed to create event"))?;

        Ok(())
    }

    async fn get_all(&self, deadline: Deadline) -> Result<Vec<Event>, RepositoryError> {
        let select = sqlx::query_as::<_, Event>(SELECT_ALL_EVENTS).fetch_all(&self.pool);

        deadline
            .run(select)
            .await?
            .map_err(RepositoryError::database("failed to query events"))
    }

    async fn get_by_id(&self, deadline: Deadline, id: Uuid) -> Result<Event, RepositoryError> {
        let select = sqlx::query_as::<_, Event>(SELECT_EVENT_BY_ID)
            .bind(id)
            .fetch_one(&self.pool);

        match deadline.run(select).await? {
            Ok(event) => Ok(event),
            Err(sqlx::Error::RowNotFound) => Err(RepositoryError::NotFound),
            Err(e) => Err(RepositoryError::database("failed to get event")(e)),
        }
    }
}
