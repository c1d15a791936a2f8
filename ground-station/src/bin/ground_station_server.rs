//! Ground station server.
//!
//! Serves live telemetry and on-demand star tracking to observers over HTTP
//! and server-sent events.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ground_station::config::{AnalysisArgs, ServerArgs, TelemetryArgs};
use ground_station::orchestrator::AnalysisOrchestrator;
use ground_station::server::{serve, AppState};
use ground_station::telemetry::{self, SimulatedTelemetry};
use ground_station::{EventHub, EventSink};
use shared_wasm::TelemetryState;
use tokio::io::BufReader;
use track::StarTracker;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Ground station star tracker and telemetry relay")]
struct Args {
    #[command(flatten)]
    server: ServerArgs,

    #[command(flatten)]
    analysis: AnalysisArgs,

    #[command(flatten)]
    telemetry: TelemetryArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    info!("Starting ground station with {args:?}");

    let hub = Arc::new(EventHub::new(args.server.event_capacity));
    let events: Arc<dyn EventSink> = hub.clone();
    let store = telemetry::init(TelemetryState::default());

    let tracker = Arc::new(StarTracker::new(
        args.analysis.detection_settings(),
        args.analysis.search_delay(),
    ));
    let orchestrator = AnalysisOrchestrator::new(
        args.analysis.orchestrator_config(),
        tracker,
        events.clone(),
    );

    // Held for the life of the server; dropping it stops the simulation
    let _simulation = if let Some(port) = &args.telemetry.serial_port {
        let link = telemetry::open_serial_link(port, args.telemetry.baud_rate)
            .with_context(|| format!("Failed to open serial port {port}"))?;
        let feed = telemetry::spawn_serial_feed(link, store.clone(), events.clone());
        tokio::spawn(async move {
            match feed.await {
                Ok(Ok(())) => info!("Serial link closed"),
                Ok(Err(e)) => error!("Serial feed failed: {e}"),
                Err(e) => error!("Serial feed task failed: {e}"),
            }
        });
        None
    } else if let Some(path) = &args.telemetry.feed_path {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open sensor capture {}", path.display()))?;
        info!("Replaying sensor capture from {}", path.display());
        let (feed_store, feed_events) = (store.clone(), events.clone());
        tokio::spawn(async move {
            if let Err(e) =
                telemetry::run_line_feed(BufReader::new(file), feed_store, feed_events).await
            {
                error!("Sensor capture replay failed: {e}");
            }
        });
        None
    } else {
        Some(SimulatedTelemetry::spawn(
            store.clone(),
            events,
            args.telemetry.cadence(),
        ))
    };

    let address = args.server.socket_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {address}"))?;

    serve(
        listener,
        AppState {
            orchestrator,
            hub,
            telemetry: store,
        },
    )
    .await
}
