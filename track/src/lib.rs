//! Star tracking and attitude determination
//!
//! Matches detected point sources against a small built-in catalog and
//! reduces the best match to a pointing direction and ground-track position.
//!
//! ```text
//! image -> detect_stars -> PatternMatcher::identify -> estimate_attitude -> estimate_position
//! ```

pub mod catalog;
pub mod estimator;
pub mod matcher;
pub mod tracker;

pub use catalog::{Catalog, CatalogError};
pub use estimator::{best_pattern, estimate_attitude, estimate_position, NOMINAL_ORBITAL_ALTITUDE_KM};
pub use matcher::{Asterism, HeuristicMatcher, PatternMatcher, MIN_PATTERN_STARS};
pub use tracker::{StarTracker, TrackingSolution};
