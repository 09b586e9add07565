//! Server-Sent Events endpoint for job events

use axum::{extract::State, response::sse::Event, response::Sse};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::AppState;

/// GET /api/events
///
/// Streams every job lifecycle event and retention sweep.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    slush_common::sse::create_event_sse_stream("slush-vaporizer", &state.event_bus)
}
