//! Telemetry snapshot pushed to dashboards as `sensor_data`.

use serde::{Deserialize, Serialize};

/// Latest known vehicle state.
///
/// Angles are in degrees, altitude in metres (pre-flight) or km (orbital
/// simulation), speed in km/s.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetryState {
    pub temperature: f64,
    pub pressure: f64,
    pub altitude: f64,
    pub qx: f64,
    pub qy: f64,
    pub qz: f64,
    pub qw: f64,
    pub accel_x: f64,
    pub accel_y: f64,
    pub accel_z: f64,
    pub lat: f64,
    pub lon: f64,
    pub lux: f64,
    /// "Present" or "Absent"
    pub sun_up: String,
    pub lora_delay_ms: f64,
    /// "Active" or "Inactive"
    pub reaction_wheel: String,
    /// "Active" or "Inactive"
    pub magnetorquer: String,
    pub speed: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub pointing_ra: f64,
    pub pointing_dec: f64,
}

impl Default for TelemetryState {
    fn default() -> Self {
        Self {
            temperature: 25.0,
            pressure: 1013.25,
            altitude: 100.0,
            qx: 0.0,
            qy: 0.0,
            qz: 0.0,
            qw: 1.0,
            accel_x: 0.0,
            accel_y: 0.0,
            accel_z: 9.81,
            lat: 18.5204,
            lon: 73.8567,
            lux: 0.0,
            sun_up: "Absent".to_string(),
            lora_delay_ms: 0.0,
            reaction_wheel: "Inactive".to_string(),
            magnetorquer: "Inactive".to_string(),
            speed: 0.0,
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
            pointing_ra: 180.0,
            pointing_dec: 0.0,
        }
    }
}

impl TelemetryState {
    /// Copy with every numeric field rounded to 4 decimal places for display.
    pub fn rounded(&self) -> Self {
        let r = |v: f64| (v * 1e4).round() / 1e4;
        Self {
            temperature: r(self.temperature),
            pressure: r(self.pressure),
            altitude: r(self.altitude),
            qx: r(self.qx),
            qy: r(self.qy),
            qz: r(self.qz),
            qw: r(self.qw),
            accel_x: r(self.accel_x),
            accel_y: r(self.accel_y),
            accel_z: r(self.accel_z),
            lat: r(self.lat),
            lon: r(self.lon),
            lux: r(self.lux),
            sun_up: self.sun_up.clone(),
            lora_delay_ms: r(self.lora_delay_ms),
            reaction_wheel: self.reaction_wheel.clone(),
            magnetorquer: self.magnetorquer.clone(),
            speed: r(self.speed),
            roll: r(self.roll),
            pitch: r(self.pitch),
            yaw: r(self.yaw),
            pointing_ra: r(self.pointing_ra),
            pointing_dec: r(self.pointing_dec),
        }
    }
}
