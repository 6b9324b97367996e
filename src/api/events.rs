//! Live security event stream over SSE.
//!
//! Subscribes to the in-process event bus and forwards each
//! [`SecurityEvent`](crate::domain::SecurityEvent) to the client as a JSON
//! payload. Slow clients that fall behind the broadcast buffer get a
//! `warning` event instead of the messages they missed.

use axum::{
    Router,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use futures::stream::{self, Stream};
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio::sync::broadcast;
use tracing::warn;

use crate::api::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/events", get(sse_handler))
}

async fn sse_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.event_bus().subscribe();

    let stream = stream::unfold(rx, |mut rx| async move {
        let event = match rx.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => Event::default().event("security").data(json),
                Err(e) => {
                    warn!(error = %e, "Dropping unserializable event");
                    Event::default().event("warning").data("Dropped one event")
                }
            },
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "SSE client fell behind the event bus");
                Event::default()
                    .event("warning")
                    .data(format!("Missed {missed} events"))
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        };

        Some((Ok(event), rx))
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
