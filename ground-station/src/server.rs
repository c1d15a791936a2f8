//! HTTP surface: telemetry snapshots, analysis triggers and per-observer
//! server-sent event streams.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use serde::Serialize;
use shared_wasm::TelemetryState;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::info;

use crate::events::{EventHub, ObserverId};
use crate::orchestrator::AnalysisOrchestrator;
use crate::telemetry::TelemetryStore;

/// Shared state behind every route.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: AnalysisOrchestrator,
    pub hub: Arc<EventHub>,
    pub telemetry: TelemetryStore,
}

#[derive(Debug, Serialize)]
struct Accepted {
    status: &'static str,
    observer: ObserverId,
}

async fn telemetry_endpoint(State(state): State<AppState>) -> Json<TelemetryState> {
    Json(state.telemetry.snapshot().rounded())
}

async fn star_tracking_endpoint(
    State(state): State<AppState>,
    Path(observer): Path<String>,
) -> impl IntoResponse {
    let observer = ObserverId::from(observer);
    info!("Star tracking triggered by {observer}");

    // Runs detached; progress and the result arrive on the observer's stream
    drop(state.orchestrator.start_analysis(observer.clone()));

    (
        StatusCode::ACCEPTED,
        Json(Accepted {
            status: "started",
            observer,
        }),
    )
}

async fn events_endpoint(
    State(state): State<AppState>,
    Path(observer): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let observer = ObserverId::from(observer);
    info!("Observer {observer} connected to event stream");

    let (rx, _) = state.hub.subscribe(observer.clone()).into_parts();
    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        // Lagged receivers skip ahead; the next event is still delivered
        let envelope = result.ok()?;
        if !envelope.is_for(&observer) {
            return None;
        }
        match envelope.event.payload_json() {
            Ok(data) => Some(Ok(Event::default().event(envelope.event.name()).data(data))),
            Err(e) => {
                tracing::warn!("Dropping unserializable {} event: {e}", envelope.event.name());
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/telemetry", get(telemetry_endpoint))
        .route("/api/star-tracking/:observer", post(star_tracking_endpoint))
        .route("/events/:observer", get(events_endpoint))
        .with_state(state)
}

/// Serve `state` on `listener` until the server fails.
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> anyhow::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Ground station listening on http://{addr}");
        info!("Telemetry endpoint: http://{addr}/api/telemetry");
        info!("Event stream: http://{addr}/events/<observer>");
    }
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}
