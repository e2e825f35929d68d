//! Server-sent event adapters for live queries and the notification bus

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use haggle_market::{EventBus, LiveQuery};
use haggle_types::MarketEvent;
use serde::Serialize;
use tokio_stream::wrappers::BroadcastStream;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);

fn keep_alive() -> KeepAlive {
    KeepAlive::new().interval(KEEP_ALIVE_INTERVAL).text("ping")
}

fn json_event<T: Serialize>(value: &T) -> Option<Event> {
    match serde_json::to_string(value) {
        Ok(json) => Some(Event::default().data(json)),
        Err(e) => {
            tracing::warn!("Failed to serialize event: {}", e);
            None
        }
    }
}

/// Stream every snapshot of a live query. A store failure is sent as an
/// `error` event and ends the stream.
pub fn live_query<T>(
    query: LiveQuery<T>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static>
where
    T: Serialize + Send + 'static,
{
    let stream = query
        .scan(false, |failed, snapshot| {
            if *failed {
                return futures::future::ready(None);
            }
            let event = match snapshot {
                Ok(items) => json_event(&items),
                Err(e) => {
                    tracing::warn!(error = %e, "Live query failed");
                    *failed = true;
                    Some(Event::default().event("error").data(e.to_string()))
                }
            };
            futures::future::ready(Some(event))
        })
        .filter_map(|event| futures::future::ready(event.map(Ok)));

    Sse::new(stream).keep_alive(keep_alive())
}

/// Stream notification events, optionally only those of one chat
pub fn market_events(
    bus: &EventBus,
    chat_id: Option<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
    let stream = BroadcastStream::new(bus.subscribe()).filter_map(move |result| {
        let event = match result {
            Ok(event) if matches_chat(&event, chat_id.as_deref()) => json_event(&event),
            Ok(_) => None,
            Err(e) => {
                // Lagged receivers skip ahead
                tracing::debug!("SSE stream error: {}", e);
                None
            }
        };
        futures::future::ready(event.map(Ok))
    });

    Sse::new(stream).keep_alive(keep_alive())
}

fn matches_chat(event: &MarketEvent, chat_id: Option<&str>) -> bool {
    chat_id.map_or(true, |id| event.chat_id() == id)
}
