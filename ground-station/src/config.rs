//! Command-line configuration, split into flattenable groups.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use shared_wasm::DetectionSettings;

use crate::orchestrator::OrchestratorConfig;
use crate::telemetry::DEFAULT_BAUD_RATE;

#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    #[arg(
        short = 'p',
        long,
        default_value = "5508",
        help = "HTTP server port",
        long_help = "TCP port for the HTTP server. Telemetry is served at /api/telemetry \
            and observer event streams at /events/<observer>."
    )]
    pub port: u16,

    #[arg(
        short = 'b',
        long,
        default_value = "0.0.0.0",
        help = "HTTP server bind address",
        long_help = "IP address to bind the HTTP server to. Use '0.0.0.0' to listen on all \
            interfaces, or '127.0.0.1' for localhost-only access."
    )]
    pub bind_address: String,

    #[arg(
        long,
        default_value = "256",
        help = "Events buffered per observer before slow observers start missing them"
    )]
    pub event_capacity: usize,
}

impl ServerArgs {
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[derive(Args, Debug, Clone)]
pub struct AnalysisArgs {
    #[arg(
        long,
        default_value = "static/imgs/star_field.jpg",
        help = "Star field image analyzed by the integrated pipeline"
    )]
    pub star_image: PathBuf,

    #[arg(
        long = "external-program",
        default_values = ["../final/final8.py", "../final8.py"],
        help = "External analysis program to try, in priority order (repeatable)",
        long_help = "External analysis program to try, in priority order (repeatable). \
            Relative paths are resolved against the server's working directory, so the \
            defaults assume the server is started from its install directory."
    )]
    pub external_programs: Vec<PathBuf>,

    #[arg(
        long,
        default_value = "python3",
        help = "Interpreter used to run the external program",
        long_help = "Interpreter the external analysis program is passed to. An empty value \
            executes the program directly."
    )]
    pub interpreter: String,

    #[arg(long, default_value = "100.0", help = "Smoothed intensity a pixel must exceed")]
    pub threshold: f64,

    #[arg(long, default_value = "5", help = "Smallest accepted star area in pixels")]
    pub min_area: usize,

    #[arg(long, default_value = "500", help = "Largest accepted star area in pixels")]
    pub max_area: usize,

    #[arg(
        long,
        default_value = "3000",
        help = "Simulated pattern search time in milliseconds"
    )]
    pub search_delay_ms: u64,
}

impl AnalysisArgs {
    pub fn detection_settings(&self) -> DetectionSettings {
        DetectionSettings {
            threshold: self.threshold,
            min_area: self.min_area,
            max_area: self.max_area,
        }
    }

    pub fn search_delay(&self) -> Duration {
        Duration::from_millis(self.search_delay_ms)
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            star_image_path: self.star_image.clone(),
            program_candidates: self.external_programs.clone(),
            interpreter: (!self.interpreter.is_empty()).then(|| PathBuf::from(&self.interpreter)),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct TelemetryArgs {
    #[arg(
        long,
        default_value = "100",
        help = "Simulated telemetry update period in milliseconds"
    )]
    pub telemetry_cadence_ms: u64,

    #[arg(
        long,
        conflicts_with = "feed_path",
        help = "Serial port of the sensor board (e.g. /dev/ttyUSB0, COM3)",
        long_help = "Serial port the sensor board streams BNO and BMP records on. The port is \
            opened at --baud-rate with a one second read timeout. Without this or --feed-path, \
            telemetry is simulated."
    )]
    pub serial_port: Option<String>,

    #[arg(
        long,
        default_value_t = DEFAULT_BAUD_RATE,
        help = "Sensor board serial link speed in bits per second"
    )]
    pub baud_rate: u32,

    #[arg(
        long,
        help = "Replay sensor records from a capture file instead of simulating",
        long_help = "Path to a line-oriented capture of the sensor board's BNO and BMP records, \
            replayed once at read speed."
    )]
    pub feed_path: Option<PathBuf>,
}

impl TelemetryArgs {
    pub fn cadence(&self) -> Duration {
        Duration::from_millis(self.telemetry_cadence_ms)
    }
}
