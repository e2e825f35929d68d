use axum::{
    extract::{Query, State},
    response::sse::{Event, Sse},
};
use futures::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;

use crate::{sse, state::AppState};

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub chat_id: Option<String>,
}

/// Notification events as they are published
pub async fn stream_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    sse::market_events(state.market.events(), query.chat_id)
}
