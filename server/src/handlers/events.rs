use std::time::Duration;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use tracing::info;
use uuid::Uuid;

use crate::models::{CreateEventRequest, Event};
use crate::repository::EventRepository;
use crate::state::AppState;
use crate::utils::deadline::Deadline;
use crate::utils::error::AppError;
use crate::utils::response::json;

/// Processing budget for a single request, store round trip included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const MISSING_EVENT_ID: &str = "missing event ID";
const INVALID_EVENT_ID: &str = "invalid event ID format";

/// `GET /events`
pub async fn list_events<R: EventRepository>(
    State(state): State<AppState<R>>,
) -> Result<Response, AppError> {
    let deadline = Deadline::after(REQUEST_TIMEOUT);

    let events = state
        .events
        .get_all(deadline)
        .await
        .map_err(|e| AppError::from_repository(e, "Failed to fetch events"))?;

    Ok(json(StatusCode::OK, &events))
}

/// `POST /events`
pub async fn create_event<R: EventRepository>(
    State(state): State<AppState<R>>,
    payload: Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let deadline = Deadline::after(REQUEST_TIMEOUT);

    let Json(request) =
        payload.map_err(|rejection| AppError::InvalidPayload(rejection.body_text()))?;
    let event = Event::new(request)?;

    state
        .events
        .create(deadline, &event)
        .await
        .map_err(|e| AppError::from_repository(e, "Failed to create event"))?;

    info!(event_id = %event.id, "Event created");
    Ok(json(StatusCode::CREATED, &event))
}

/// `GET /events/{id}`. Only the first segment after `/events/` names the
/// event, so `/events/{id}/` and `/events/{id}/extra` resolve the same way.
pub async fn get_event<R: EventRepository>(
    State(state): State<AppState<R>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, AppError> {
    let deadline = Deadline::after(REQUEST_TIMEOUT);
    let id = event_id_from_path(path)?;

    let event = state
        .events
        .get_by_id(deadline, id)
        .await
        .map_err(|e| AppError::from_repository(e, "Failed to fetch event"))?;

    Ok(json(StatusCode::OK, &event))
}

/// Any method other than GET/POST on `/events`.
pub async fn events_method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Any method other than GET on `/events/{id}`. The id is still checked
/// first, so a malformed id wins over the method.
pub async fn item_method_not_allowed(path: Result<Path<String>, PathRejection>) -> AppError {
    match event_id_from_path(path) {
        Ok(_) => AppError::MethodNotAllowed,
        Err(e) => e,
    }
}

/// `/events/` with an empty id segment.
pub async fn missing_event_id() -> AppError {
    AppError::InvalidId(MISSING_EVENT_ID)
}

fn event_id_from_path(path: Result<Path<String>, PathRejection>) -> Result<Uuid, AppError> {
    let Path(raw) = path.map_err(|_| AppError::InvalidId(INVALID_EVENT_ID))?;
    parse_event_id(&raw)
}

fn parse_event_id(rest: &str) -> Result<Uuid, AppError> {
    let segment = rest.split('/').next().unwrap_or_default();
    if segment.is_empty() {
        return Err(AppError::InvalidId(MISSING_EVENT_ID));
    }
    Uuid::parse_str(segment).map_err(|_| AppError::InvalidId(INVALID_EVENT_ID))
}
