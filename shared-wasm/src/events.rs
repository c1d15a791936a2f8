//! Events pushed from the ground station to observers.

use serde::{Deserialize, Serialize};

use crate::star_tracking::StarTrackingResult;
use crate::telemetry::TelemetryState;

/// Free-form progress message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub message: String,
}

/// An event as delivered to an observer.
///
/// Serialized as `{"event": <name>, "payload": {...}}`; transports that carry
/// the event name out of band (SSE) send only [`StationEvent::payload_json`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum StationEvent {
    Notification(Notification),
    StarTrackingResult(StarTrackingResult),
    SensorData(TelemetryState),
}

impl StationEvent {
    pub fn notification(message: impl Into<String>) -> Self {
        Self::Notification(Notification {
            message: message.into(),
        })
    }

    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            StationEvent::Notification(_) => "notification",
            StationEvent::StarTrackingResult(_) => "star_tracking_result",
            StationEvent::SensorData(_) => "sensor_data",
        }
    }

    /// Whether this event ends a star tracking run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StationEvent::StarTrackingResult(_))
    }

    /// JSON encoding of the payload alone.
    pub fn payload_json(&self) -> serde_json::Result<String> {
        match self {
            StationEvent::Notification(n) => serde_json::to_string(n),
            StationEvent::StarTrackingResult(r) => serde_json::to_string(r),
            StationEvent::SensorData(s) => serde_json::to_string(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_names() {
        assert_eq!(StationEvent::notification("hi").name(), "notification");
        assert_eq!(
            StationEvent::StarTrackingResult(StarTrackingResult::external(1)).name(),
            "star_tracking_result"
        );
        assert_eq!(
            StationEvent::SensorData(TelemetryState::default()).name(),
            "sensor_data"
        );
    }

    #[test]
    fn test_tagged_encoding() {
        let event = StationEvent::notification("Detecting stars from image...");
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"event": "notification", "payload": {"message": "Detecting stars from image..."}})
        );
        assert_eq!(
            event.payload_json().unwrap(),
            r#"{"message":"Detecting stars from image..."}"#
        );
        assert!(!event.is_terminal());
    }
}
