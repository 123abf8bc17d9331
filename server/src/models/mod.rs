pub mod event;

pub use event::{CreateEventRequest, Event, ValidationError, MAX_TITLE_LENGTH};
