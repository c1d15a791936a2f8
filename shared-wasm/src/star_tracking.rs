//! Star tracking results: catalog entries, pattern matches and the attitude
//! and position derived from them.

use serde::{Deserialize, Serialize};

use crate::star_detection::DetectedStar;

/// A reference star from the built-in catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogStar {
    /// Common name, unique within a catalog
    pub name: String,
    /// Apparent visual magnitude (lower is brighter)
    pub magnitude: f64,
    /// Right ascension in degrees, [0, 360)
    pub right_ascension_deg: f64,
    /// Declination in degrees, [-90, 90]
    pub declination_deg: f64,
    /// Constellation the star belongs to
    pub constellation: String,
}

/// A detected source paired with the catalog star it is hypothesized to be.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchedStar {
    pub detected: DetectedStar,
    /// Read-only snapshot of the catalog entry
    pub catalog_star: CatalogStar,
}

/// One recognized asterism.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternMatch {
    pub constellation: String,
    /// Goodness of fit in [0, 1]
    pub confidence: f64,
    pub matched_stars: Vec<MatchedStar>,
    pub description: String,
}

/// Coarse attitude solution derived from the best pattern match.
///
/// Only `pointing_ra` and `pointing_dec` come from the match. Roll, pitch and
/// yaw are placeholder values since no sensor-fusion solve is performed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attitude {
    pub pointing_ra: f64,
    pub pointing_dec: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub confidence: f64,
    pub method: String,
}

/// Ground-track position derived from an attitude.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Altitude in km
    pub altitude: f64,
}

/// Terminal payload of a star tracking run.
///
/// Exactly one of these is delivered per trigger. The wire shape is one of
/// `{error}`, `{patterns, attitude, position, message}` or
/// `{message, returncode}`. Attitude and position are omitted when absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StarTrackingResult {
    /// The run failed before producing data
    Failed { error: String },
    /// The in-process pipeline finished
    Analysis {
        patterns: Vec<PatternMatch>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attitude: Option<Attitude>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<Position>,
        message: String,
    },
    /// An external analysis program exited
    External { message: String, returncode: i32 },
}

impl StarTrackingResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    pub fn external(returncode: i32) -> Self {
        Self::External {
            message: format!("External script exited with code {returncode}."),
            returncode,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}
