//! End-to-end star tracker: detection, matching and estimation.

use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use shared::{detect_stars, ImageSize};
use shared_wasm::{Attitude, DetectedStar, DetectionSettings, PatternMatch, Position};

use crate::catalog::Catalog;
use crate::estimator::{estimate_attitude, estimate_position};
use crate::matcher::{HeuristicMatcher, PatternMatcher};

/// Result of matching one set of detections.
///
/// `attitude` and `position` are only present when `patterns` is non-empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackingSolution {
    pub patterns: Vec<PatternMatch>,
    pub attitude: Option<Attitude>,
    pub position: Option<Position>,
}

impl TrackingSolution {
    /// Human-readable one-line summary for observers.
    pub fn summary(&self) -> String {
        if self.patterns.is_empty() {
            "Analysis complete. No patterns found.".to_string()
        } else {
            format!(
                "Analysis complete. Found {} patterns.",
                self.patterns.len()
            )
        }
    }
}

/// Owns the matching strategy and detection settings for the lifetime of
/// the process.
pub struct StarTracker {
    matcher: Box<dyn PatternMatcher>,
    settings: DetectionSettings,
}

impl StarTracker {
    /// Built-in catalog with the heuristic matcher.
    pub fn new(settings: DetectionSettings, search_delay: Duration) -> Self {
        let matcher = HeuristicMatcher::new(Arc::new(Catalog::builtin()))
            .with_search_delay(search_delay);
        Self {
            matcher: Box::new(matcher),
            settings,
        }
    }

    /// Substitute a different matching strategy.
    pub fn with_matcher(mut self, matcher: Box<dyn PatternMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn detect_stars(&self, image: &DynamicImage) -> Vec<DetectedStar> {
        detect_stars(image, &self.settings)
    }

    pub fn identify_constellations_and_position(
        &self,
        image_size: ImageSize,
        detected: &[DetectedStar],
    ) -> TrackingSolution {
        let patterns = self.matcher.identify(detected, image_size);
        if patterns.is_empty() {
            return TrackingSolution::default();
        }

        let attitude = estimate_attitude(&patterns);
        let position = estimate_position(attitude.as_ref());
        TrackingSolution {
            patterns,
            attitude,
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedMatcher(Vec<PatternMatch>);

    impl PatternMatcher for FixedMatcher {
        fn identify(&self, _: &[DetectedStar], _: ImageSize) -> Vec<PatternMatch> {
            self.0.clone()
        }
    }

    #[test]
    fn test_summary_messages() {
        assert_eq!(
            TrackingSolution::default().summary(),
            "Analysis complete. No patterns found."
        );

        let solution = TrackingSolution {
            patterns: vec![PatternMatch {
                constellation: "Orion".to_string(),
                confidence: 0.8,
                matched_stars: Vec::new(),
                description: String::new(),
            }],
            ..Default::default()
        };
        assert_eq!(solution.summary(), "Analysis complete. Found 1 patterns.");
    }

    #[test]
    fn test_empty_match_has_no_attitude() {
        let tracker = StarTracker::new(DetectionSettings::default(), Duration::ZERO)
            .with_matcher(Box::new(FixedMatcher(Vec::new())));

        let solution =
            tracker.identify_constellations_and_position((100, 100).into(), &[]);
        assert_eq!(solution, TrackingSolution::default());
    }
}
