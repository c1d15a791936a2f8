//! Star detection settings and results.

use serde::{Deserialize, Serialize};

/// Settings for the threshold-and-label star detector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DetectionSettings {
    /// Smoothed intensity a pixel must exceed to count as bright (0 - 255)
    pub threshold: f64,
    /// Smallest accepted component, rejects noise speckles (pixels)
    pub min_area: usize,
    /// Largest accepted component, rejects saturated blobs (pixels)
    pub max_area: usize,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            threshold: 100.0,
            min_area: 5,
            max_area: 500,
        }
    }
}

/// A point source candidate extracted from an image.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DetectedStar {
    /// Unweighted centroid as (x, y) pixel coordinates
    pub centroid: (f64, f64),
    /// Number of pixels in the connected component
    pub pixel_area: usize,
}

impl DetectedStar {
    pub fn new(x: f64, y: f64, pixel_area: usize) -> Self {
        Self {
            centroid: (x, y),
            pixel_area,
        }
    }

    /// Column coordinate of the centroid
    pub fn x(&self) -> f64 {
        self.centroid.0
    }

    /// Row coordinate of the centroid
    pub fn y(&self) -> f64 {
        self.centroid.1
    }
}
