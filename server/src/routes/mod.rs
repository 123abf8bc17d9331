use axum::routing::{any, get};
use axum::Router;
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, ServerConfig, SecurityHeaders};
use crate::handlers::{
    create_event, events_method_not_allowed, get_event, health_check, item_method_not_allowed,
    list_events, missing_event_id,
};
use crate::repository::EventRepository;
use crate::state::AppState;

pub fn create_routes<R: EventRepository>(state: AppState<R>, config: &ServerConfig) -> Router {
    let router = Router::new()
        .route("/health", get(health_check::<R>))
        .route(
            "/events",
            get(list_events::<R>)
                .post(create_event::<R>)
                .fallback(events_method_not_allowed),
        )
        .route("/events/", any(missing_event_id))
        .route(
            "/events/*rest",
            get(get_event::<R>).fallback(item_method_not_allowed),
        )
        .with_state(state);

    SecurityHeaders::from_env()
        .apply(router)
        .layer(create_cors_layer())
        .layer(RequestBodyTimeoutLayer::new(config.read_timeout))
        .layer(TimeoutLayer::new(config.write_timeout))
        .layer(TraceLayer::new_for_http())
}
