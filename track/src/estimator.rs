//! Attitude and position estimation from pattern matches.
//!
//! Deliberately coarse: the pointing direction is the mean RA/Dec of the
//! matched catalog stars, roll/pitch/yaw are placeholders, and the position
//! is a direct relabeling of the pointing direction rather than a geodetic
//! solution.

use rand::Rng;
use shared_wasm::{Attitude, PatternMatch, Position};

/// Altitude reported for every derived position (km).
pub const NOMINAL_ORBITAL_ALTITUDE_KM: f64 = 550.0;

/// Highest-confidence match; the first one wins on ties.
pub fn best_pattern(patterns: &[PatternMatch]) -> Option<&PatternMatch> {
    patterns.iter().fold(None, |best, p| match best {
        Some(b) if b.confidence >= p.confidence => Some(b),
        _ => Some(p),
    })
}

/// Attitude from the best match, or `None` when there is nothing to work
/// from (no patterns, or a best pattern without matched stars).
pub fn estimate_attitude(patterns: &[PatternMatch]) -> Option<Attitude> {
    let best = best_pattern(patterns)?;
    if best.matched_stars.is_empty() {
        return None;
    }

    let n = best.matched_stars.len() as f64;
    let (sum_ra, sum_dec) = best.matched_stars.iter().fold((0.0, 0.0), |(ra, dec), m| {
        (
            ra + m.catalog_star.right_ascension_deg,
            dec + m.catalog_star.declination_deg,
        )
    });

    // No sensor fusion is performed, so roll/pitch/yaw are illustrative only
    let mut rng = rand::rng();
    Some(Attitude {
        pointing_ra: sum_ra / n,
        pointing_dec: sum_dec / n,
        roll: rng.random_range(-180.0..=180.0),
        pitch: rng.random_range(-90.0..=90.0),
        yaw: rng.random_range(-180.0..=180.0),
        confidence: best.confidence,
        method: format!("Pattern Matching ({})", best.constellation),
    })
}

/// Ground-track position: latitude = pointing Dec, longitude = pointing RA - 180.
pub fn estimate_position(attitude: Option<&Attitude>) -> Option<Position> {
    attitude.map(|a| Position {
        latitude: a.pointing_dec,
        longitude: a.pointing_ra - 180.0,
        altitude: NOMINAL_ORBITAL_ALTITUDE_KM,
    })
}
