//! Live vehicle telemetry.
//!
//! The latest [`TelemetryState`] lives in a [`TelemetryStore`]. A
//! process-wide store is reachable through [`init`], [`snapshot`] and
//! [`update`]; components that need isolation (tests, multiple stations in
//! one process) can hold their own store instead.
//!
//! Two producers feed a store: [`SimulatedTelemetry`], which synthesizes an
//! orbital attitude sweep, and [`run_line_feed`], which ingests the sensor
//! board's comma-separated records.

use std::f64::consts::PI;
use std::io::{BufRead, ErrorKind, Read};
use std::num::ParseFloatError;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use rand::Rng;
use serialport::SerialPort;
use shared_wasm::{StationEvent, TelemetryState};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinHandle;

use crate::events::EventSink;

/// Ground station site, used for every reported lat/lon.
pub const SITE_LATITUDE: f64 = 18.5204;
pub const SITE_LONGITUDE: f64 = 73.8567;

/// Offset of the site's local time from UTC (+05:30).
const SITE_UTC_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Acceleration magnitude change (m/s^2) treated as an actuator firing.
const ACTUATOR_ACCEL_JUMP: f64 = 0.5;
const ACTUATOR_HOLD: Duration = Duration::from_secs(1);

/// Sensor board link speed.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
const SERIAL_READ_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Malformed sensor record: {0:?}")]
    MalformedRecord(String),
    #[error("Invalid number in sensor record: {0}")]
    InvalidNumber(#[from] ParseFloatError),
    #[error("Serial link error: {0}")]
    Serial(#[from] serialport::Error),
}

/// Shared handle to the latest telemetry. Cloning is cheap.
#[derive(Clone, Default)]
pub struct TelemetryStore {
    state: Arc<RwLock<TelemetryState>>,
}

impl TelemetryStore {
    pub fn new(initial: TelemetryState) -> Self {
        Self {
            state: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn snapshot(&self) -> TelemetryState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply `f` to the stored state and return the updated copy.
    pub fn update(&self, f: impl FnOnce(&mut TelemetryState)) -> TelemetryState {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state);
        state.clone()
    }

    pub fn replace(&self, next: TelemetryState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

static GLOBAL: OnceLock<TelemetryStore> = OnceLock::new();

/// The process-wide store, created with default values on first use.
pub fn global() -> TelemetryStore {
    GLOBAL.get_or_init(TelemetryStore::default).clone()
}

/// Seed the process-wide store. Later calls overwrite the state.
pub fn init(initial: TelemetryState) -> TelemetryStore {
    let store = global();
    store.replace(initial);
    store
}

pub fn snapshot() -> TelemetryState {
    global().snapshot()
}

pub fn update(f: impl FnOnce(&mut TelemetryState)) -> TelemetryState {
    global().update(f)
}

/// Euler angles and derived pointing for a unit quaternion, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub pointing_ra: f64,
    pub pointing_dec: f64,
}

/// Roll (x), pitch (y) and yaw (z) of a quaternion, plus a visualization
/// pointing of RA = (yaw + 180) mod 360 and Dec = pitch.
pub fn quaternion_to_euler_and_pointing(qx: f64, qy: f64, qz: f64, qw: f64) -> Orientation {
    let roll = (2.0 * (qw * qx + qy * qz))
        .atan2(1.0 - 2.0 * (qx * qx + qy * qy))
        .to_degrees();
    let pitch = (2.0 * (qw * qy - qz * qx)).clamp(-1.0, 1.0).asin().to_degrees();
    let yaw = (2.0 * (qw * qz + qx * qy))
        .atan2(1.0 - 2.0 * (qy * qy + qz * qz))
        .to_degrees();

    Orientation {
        roll,
        pitch,
        yaw,
        pointing_ra: (yaw + 180.0).rem_euclid(360.0),
        pointing_dec: pitch,
    }
}

/// Quaternion (qx, qy, qz, qw) for roll/pitch/yaw in degrees.
pub fn euler_to_quaternion(roll: f64, pitch: f64, yaw: f64) -> (f64, f64, f64, f64) {
    let half = |deg: f64| deg * PI / 360.0;
    let (sr, cr) = half(roll).sin_cos();
    let (sp, cp) = half(pitch).sin_cos();
    let (sy, cy) = half(yaw).sin_cos();

    (
        sr * cp * cy - cr * sp * sy,
        cr * sp * cy + sr * cp * sy,
        cr * cp * sy - sr * sp * cy,
        cr * cp * cy + sr * sp * sy,
    )
}

/// "Present" between 06:00 and 18:00 site time, "Absent" otherwise.
pub fn sun_status(now: DateTime<Utc>) -> &'static str {
    let hour = FixedOffset::east_opt(SITE_UTC_OFFSET_SECS)
        .map(|offset| now.with_timezone(&offset).hour())
        .unwrap_or_else(|| now.hour());
    if (6..18).contains(&hour) {
        "Present"
    } else {
        "Absent"
    }
}

/// Simulated orbital sample `elapsed` after the sweep started.
pub fn simulated_sample(elapsed: Duration, now: DateTime<Utc>, rng: &mut impl Rng) -> TelemetryState {
    let t = elapsed.as_secs_f64();
    let pitch = 30.0 * (0.1 * t).sin();
    let roll = 20.0 * (0.07 * t).cos();
    let yaw = 50.0 * (0.05 * t).sin();
    let (qx, qy, qz, qw) = euler_to_quaternion(roll, pitch, yaw);

    let sun_up = sun_status(now);
    let lux = if sun_up == "Present" {
        rng.random_range(10_000.0..25_000.0)
    } else {
        rng.random_range(0.0..2.0)
    };

    TelemetryState {
        temperature: -10.0,
        pressure: 0.05,
        altitude: 550.0 + rng.random_range(-5.0..=5.0),
        qx,
        qy,
        qz,
        qw,
        accel_x: rng.random_range(-0.1..=0.1),
        accel_y: rng.random_range(-0.1..=0.1),
        accel_z: rng.random_range(-0.1..=0.1),
        lat: SITE_LATITUDE,
        lon: SITE_LONGITUDE,
        lux,
        sun_up: sun_up.to_string(),
        lora_delay_ms: rng.random_range(30.0..90.0),
        reaction_wheel: "Inactive".to_string(),
        magnetorquer: "Inactive".to_string(),
        speed: rng.random_range(7.5..7.8),
        roll,
        pitch,
        yaw,
        pointing_ra: (yaw + 180.0).rem_euclid(360.0),
        pointing_dec: pitch,
    }
}

/// Background simulated telemetry source.
///
/// Spawns a tokio task on creation that writes a sample to the store and
/// broadcasts it every `cadence`. The task is cancelled on drop.
pub struct SimulatedTelemetry {
    handle: JoinHandle<()>,
}

impl SimulatedTelemetry {
    pub fn spawn(store: TelemetryStore, events: Arc<dyn EventSink>, cadence: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let start = Instant::now();
            let mut ticker = tokio::time::interval(cadence.max(Duration::from_millis(1)));
            loop {
                ticker.tick().await;
                let sample = simulated_sample(start.elapsed(), Utc::now(), &mut rand::rng());
                store.replace(sample.clone());
                events.emit(None, StationEvent::SensorData(sample.rounded()));
            }
        });
        tracing::info!("Simulated telemetry started ({cadence:?} cadence)");
        Self { handle }
    }
}

impl Drop for SimulatedTelemetry {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// One record from the sensor board.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorRecord {
    /// IMU orientation quaternion and acceleration
    Bno {
        qx: f64,
        qy: f64,
        qz: f64,
        qw: f64,
        accel_x: f64,
        accel_y: f64,
        accel_z: f64,
    },
    /// Barometer temperature, pressure and altitude
    Bmp {
        temperature: f64,
        pressure: f64,
        altitude: f64,
    },
}

fn parse_fields<const N: usize>(line: &str, fields: &[&str]) -> Result<[f64; N], TelemetryError> {
    if fields.len() != N {
        return Err(TelemetryError::MalformedRecord(line.to_string()));
    }
    let mut values = [0.0; N];
    for (value, field) in values.iter_mut().zip(fields) {
        *value = field.trim().parse()?;
    }
    Ok(values)
}

/// Parse a `BNO,qx,qy,qz,qw,ax,ay,az` or `BMP,t,p,alt` line.
pub fn parse_sensor_line(line: &str) -> Result<SensorRecord, TelemetryError> {
    let line = line.trim();
    let mut parts = line.split(',');
    let kind = parts.next().unwrap_or_default();
    let fields: Vec<&str> = parts.collect();

    match kind {
        "BNO" => {
            let [qx, qy, qz, qw, accel_x, accel_y, accel_z] = parse_fields(line, &fields)?;
            Ok(SensorRecord::Bno {
                qx,
                qy,
                qz,
                qw,
                accel_x,
                accel_y,
                accel_z,
            })
        }
        "BMP" => {
            let [temperature, pressure, altitude] = parse_fields(line, &fields)?;
            Ok(SensorRecord::Bmp {
                temperature,
                pressure,
                altitude,
            })
        }
        _ => Err(TelemetryError::MalformedRecord(line.to_string())),
    }
}

/// Folds sensor records into telemetry state, tracking actuator activity.
#[derive(Debug, Default)]
pub struct LineFeed {
    last_accel_magnitude: f64,
    actuators_active_until: Option<Instant>,
}

impl LineFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `record` into `state` as observed at `now`.
    pub fn apply(
        &mut self,
        record: SensorRecord,
        state: &mut TelemetryState,
        now: Instant,
        wall_clock: DateTime<Utc>,
        rng: &mut impl Rng,
    ) {
        match record {
            SensorRecord::Bno {
                qx,
                qy,
                qz,
                qw,
                accel_x,
                accel_y,
                accel_z,
            } => {
                state.qx = qx;
                state.qy = qy;
                state.qz = qz;
                state.qw = qw;
                state.accel_x = accel_x;
                state.accel_y = accel_y;
                state.accel_z = accel_z;
            }
            SensorRecord::Bmp {
                temperature,
                pressure,
                altitude,
            } => {
                state.temperature = temperature;
                state.pressure = pressure;
                state.altitude = altitude;
            }
        }

        let magnitude =
            (state.accel_x.powi(2) + state.accel_y.powi(2) + state.accel_z.powi(2)).sqrt();
        if (magnitude - self.last_accel_magnitude).abs() > ACTUATOR_ACCEL_JUMP {
            self.actuators_active_until = Some(now + ACTUATOR_HOLD);
        }
        self.last_accel_magnitude = magnitude;

        let actuator = if self.actuators_active_until.is_some_and(|until| now < until) {
            "Active"
        } else {
            "Inactive"
        };
        state.reaction_wheel = actuator.to_string();
        state.magnetorquer = actuator.to_string();

        let orientation = quaternion_to_euler_and_pointing(state.qx, state.qy, state.qz, state.qw);
        state.roll = orientation.roll;
        state.pitch = orientation.pitch;
        state.yaw = orientation.yaw;
        state.pointing_ra = orientation.pointing_ra;
        state.pointing_dec = orientation.pointing_dec;

        let sun_up = sun_status(wall_clock);
        state.lux = if sun_up == "Present" {
            rng.random_range(1000.0..2000.0)
        } else {
            rng.random_range(0.0..2.0)
        };
        state.sun_up = sun_up.to_string();
        state.lora_delay_ms = rng.random_range(20.0..80.0);
        state.lat = SITE_LATITUDE;
        state.lon = SITE_LONGITUDE;
        state.speed = 0.0;
    }
}

/// Ingest sensor lines from `reader` until end of input.
///
/// Each accepted record updates `store` and is broadcast as `sensor_data`.
/// Blank and malformed lines are skipped.
pub async fn run_line_feed<R>(
    reader: R,
    store: TelemetryStore,
    events: Arc<dyn EventSink>,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut feed = LineFeed::new();
    let mut lines = reader.lines();
    let mut accepted = 0usize;

    while let Some(line) = lines.next_line().await? {
        if ingest_line(&mut feed, &line, &store, events.as_ref()) {
            accepted += 1;
        }
    }

    tracing::info!("Sensor feed ended after {accepted} records");
    Ok(())
}

/// Parse one raw line and fold it into `store`. Returns whether it was a
/// valid record.
fn ingest_line(
    feed: &mut LineFeed,
    line: &str,
    store: &TelemetryStore,
    events: &dyn EventSink,
) -> bool {
    if line.trim().is_empty() {
        return false;
    }
    let record = match parse_sensor_line(line) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!("Skipping sensor line: {e}");
            return false;
        }
    };

    let state = store.update(|state| {
        feed.apply(record, state, Instant::now(), Utc::now(), &mut rand::rng())
    });
    events.emit(None, StationEvent::SensorData(state.rounded()));
    true
}

/// Open the sensor board's serial link at `baud_rate` with the board's
/// one second read timeout.
pub fn open_serial_link(path: &str, baud_rate: u32) -> Result<Box<dyn SerialPort>, TelemetryError> {
    tracing::info!("Opening serial port: {path} at {baud_rate} bps");
    let port = serialport::new(path, baud_rate)
        .timeout(SERIAL_READ_TIMEOUT)
        .open()?;
    Ok(port)
}

/// Blocking counterpart of [`run_line_feed`] for serial links.
///
/// Read timeouts are expected on an idle link and do not end the feed; a
/// partial line survives the timeout and is completed by the next read.
/// Bytes that are not UTF-8 are replaced before parsing.
pub fn run_serial_feed<R: Read>(
    reader: R,
    store: TelemetryStore,
    events: Arc<dyn EventSink>,
) -> std::io::Result<()> {
    let mut feed = LineFeed::new();
    let mut reader = std::io::BufReader::new(reader);
    let mut buf = Vec::new();
    let mut accepted = 0usize;

    loop {
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => continue,
            Err(e) => return Err(e),
        }
        if buf.last() != Some(&b'\n') {
            // End of input mid-line; the next read returns 0
            continue;
        }
        if ingest_line(&mut feed, &String::from_utf8_lossy(&buf), &store, events.as_ref()) {
            accepted += 1;
        }
        buf.clear();
    }

    let tail = String::from_utf8_lossy(&buf);
    if ingest_line(&mut feed, &tail, &store, events.as_ref()) {
        accepted += 1;
    }
    tracing::info!("Serial feed ended after {accepted} records");
    Ok(())
}

/// Run [`run_serial_feed`] over an open port on the blocking pool.
pub fn spawn_serial_feed(
    port: Box<dyn SerialPort>,
    store: TelemetryStore,
    events: Arc<dyn EventSink>,
) -> JoinHandle<std::io::Result<()>> {
    tokio::task::spawn_blocking(move || run_serial_feed(port, store, events))
}
