use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use serde::Serialize;

use crate::repository::EventRepository;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::json;

pub mod events;

pub use events::{
    create_event, events_method_not_allowed, get_event, item_method_not_allowed, list_events,
    missing_event_id, REQUEST_TIMEOUT,
};

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    database: &'static str,
}

/// Reports whether the shared database handle is established. Uses the
/// non-connecting accessor so a probe never opens a connection.
pub async fn health_check<R: EventRepository>(
    State(state): State<AppState<R>>,
) -> Result<Response, AppError> {
    match state.database.get_conn() {
        Some(_) => Ok(json(
            StatusCode::OK,
            &HealthPayload {
                status: "ok",
                database: "connected",
            },
        )),
        None => Err(AppError::Unavailable),
    }
}
