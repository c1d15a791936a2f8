//! Shared WASM-compatible wire types for the ground station.
//!
//! Everything in here crosses a thread, process or network boundary: star
//! detections, pattern matches, attitude solutions, telemetry snapshots and
//! the events that carry them to observers. All types must stay
//! WASM-compatible so a browser dashboard can decode them directly.

pub mod events;
pub mod star_detection;
pub mod star_tracking;
pub mod telemetry;

pub use events::{Notification, StationEvent};
pub use star_detection::{DetectedStar, DetectionSettings};
pub use star_tracking::{
    Attitude, CatalogStar, MatchedStar, PatternMatch, Position, StarTrackingResult,
};
pub use telemetry::TelemetryState;
