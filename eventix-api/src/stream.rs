use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::{Stream, StreamExt};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, warn};

use crate::state::AppState;

/// GET /api/events/stream
/// Catalog changes as server-sent events named after the change type.
/// Delivery is best-effort: a subscriber that falls behind skips what it missed.
pub async fn catalog_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.catalog_stream.subscribe();
    debug!("Catalog stream subscriber connected");

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(change) => match Event::default().event(change.name()).json_data(&change) {
                Ok(event) => Some(Ok(event)),
                Err(e) => {
                    warn!("Dropping unserializable catalog change: {}", e);
                    None
                }
            },
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!("Catalog stream subscriber lagged, {} change(s) skipped", skipped);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
