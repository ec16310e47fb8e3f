//! services/api/src/web/stream.rs
//!
//! Server-sent-events endpoint for analysis generation.
//!
//! Event protocol:
//! - `chunk`: `{"text": ...}` with the full text generated so far.
//! - `done`: `{"text": ...}` with the final text.
//! - `error`: `{"message": ...}`; ends the stream, no partial result is kept.

use std::convert::Infallible;
use std::sync::Arc;

use analista_core::ports::PortError;
use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
    Json,
};
use futures::Stream;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::info;

use crate::services::analysis::AnalysisRequest;
use crate::web::rest::port_error_response;
use crate::web::state::AppState;

/// What the generation task reports to the connection.
#[derive(Debug)]
enum StreamUpdate {
    Chunk(String),
    Done(String),
    Failed(PortError),
}

/// Stops the generation task once the client has gone away.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn event(name: &str, payload: serde_json::Value) -> Event {
    Event::default().event(name).data(payload.to_string())
}

/// Stream an AI-written analysis as server-sent events.
#[utoipa::path(
    post,
    path = "/analysis/stream",
    request_body = AnalysisRequest,
    responses(
        (status = 200, description = "text/event-stream of `chunk` events, then `done` or `error`"),
        (status = 400, description = "Empty prompt"),
        (status = 401, description = "No usable API key is selected")
    )
)]
pub async fn stream_analysis_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<AnalysisRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state
        .analysis
        .prepare(&request)
        .map_err(port_error_response)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let analysis = app_state.analysis.clone();
    let task = tokio::spawn(async move {
        let chunks = tx.clone();
        let outcome = analysis
            .stream_analysis(&request, |text| {
                let _ = chunks.send(StreamUpdate::Chunk(text));
            })
            .await;
        let _ = tx.send(match outcome {
            Ok(text) => StreamUpdate::Done(text),
            Err(e) => StreamUpdate::Failed(e),
        });
    });

    let guard = AbortOnDrop(task.abort_handle());
    Ok(Sse::new(into_events(rx, guard)).keep_alive(KeepAlive::default()))
}

fn into_events(
    mut updates: mpsc::UnboundedReceiver<StreamUpdate>,
    guard: AbortOnDrop,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let _guard = guard;
        while let Some(update) = updates.recv().await {
            match update {
                StreamUpdate::Chunk(text) => yield Ok(event("chunk", json!({ "text": text }))),
                StreamUpdate::Done(text) => {
                    info!(chars = text.chars().count(), "Analysis stream finished");
                    yield Ok(event("done", json!({ "text": text })));
                    break;
                }
                StreamUpdate::Failed(e) => {
                    yield Ok(event("error", json!({ "message": e.to_string() })));
                    break;
                }
            }
        }
    }
}
