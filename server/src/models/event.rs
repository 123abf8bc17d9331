use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

pub const MAX_TITLE_LENGTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title must be non-empty and at most 100 characters")]
    InvalidTitle,

    #[error("start time must be before end time")]
    InvalidTimeRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Builds a new event from a creation request, assigning a fresh id and
    /// the creation timestamp. The request is validated first.
    ///
    /// All timestamps are truncated to microseconds, the precision PostgreSQL
    /// keeps for `TIMESTAMPTZ`, so the event matches what a later read
    /// returns. The time range is checked after truncation.
    pub fn new(mut request: CreateEventRequest) -> Result<Self, ValidationError> {
        request.start_time = request.start_time.trunc_subsecs(6);
        request.end_time = request.end_time.trunc_subsecs(6);
        request.validate()?;

        Ok(Self {
            id: Uuid::new_v4(),
            title: request.title,
            description: request.description,
            start_time: request.start_time,
            end_time: request.end_time,
            created_at: Utc::now().trunc_subsecs(6),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl CreateEventRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let title_length = self.title.chars().count();
        if title_length == 0 || title_length > MAX_TITLE_LENGTH {
            return Err(ValidationError::InvalidTitle);
        }
        if self.start_time >= self.end_time {
            return Err(ValidationError::InvalidTimeRange);
        }
        Ok(())
    }
}
