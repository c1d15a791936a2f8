//! Pattern matching between detected sources and catalog asterisms.
//!
//! [`PatternMatcher`] is the capability the rest of the system depends on.
//! [`HeuristicMatcher`] is the reference strategy: it does not solve the
//! geometry, it recognizes an asterism by detection count tier and pairs the
//! brightest detections with the asterism's catalog members in magnitude
//! order. A real geometric solver can be dropped in behind the same trait.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::Rng;
use shared::ImageSize;
use shared_wasm::{CatalogStar, DetectedStar, MatchedStar, PatternMatch};

use crate::catalog::Catalog;

/// Below this many detections geometric matching is meaningless.
pub const MIN_PATTERN_STARS: usize = 3;

/// Default cost of the simulated geometric search.
pub const DEFAULT_SEARCH_DELAY: Duration = Duration::from_secs(3);

/// Proposes constellation matches for a set of detections.
pub trait PatternMatcher: Send + Sync {
    /// Returns zero or more independent matches. An empty result is the normal
    /// "no plausible pattern" outcome, not an error.
    fn identify(&self, detected: &[DetectedStar], image_size: ImageSize) -> Vec<PatternMatch>;
}

/// A recognizable arrangement of catalog stars.
#[derive(Debug, Clone)]
pub struct Asterism {
    pub constellation: String,
    pub description: String,
    /// Catalog names of the stars to pair with detections
    pub members: Vec<String>,
    /// Detection count at which this asterism is considered present
    pub min_detections: usize,
    pub base_confidence: f64,
    /// Half-width of the uniform confidence jitter
    pub confidence_jitter: f64,
}

impl Asterism {
    /// Orion's Rigel / Betelgeuse / Mintaka triangle.
    pub fn orion() -> Self {
        Self {
            constellation: "Orion".to_string(),
            description: "The Hunter constellation (Simulated Find)".to_string(),
            members: vec![
                "Rigel".to_string(),
                "Betelgeuse".to_string(),
                "Mintaka".to_string(),
            ],
            min_detections: 5,
            base_confidence: 0.85,
            confidence_jitter: 0.05,
        }
    }
}

/// Count-tier heuristic matcher.
pub struct HeuristicMatcher {
    catalog: Arc<Catalog>,
    asterisms: Vec<Asterism>,
    search_delay: Duration,
}

impl HeuristicMatcher {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            asterisms: vec![Asterism::orion()],
            search_delay: DEFAULT_SEARCH_DELAY,
        }
    }

    /// Replace the simulated search cost; zero disables the wait.
    pub fn with_search_delay(mut self, search_delay: Duration) -> Self {
        self.search_delay = search_delay;
        self
    }

    pub fn with_asterisms(mut self, asterisms: Vec<Asterism>) -> Self {
        self.asterisms = asterisms;
        self
    }

    /// Catalog members of an asterism, brightest first. `None` if any member
    /// is missing from the catalog or belongs to another constellation.
    fn ranked_members<'a>(&'a self, asterism: &'a Asterism) -> Option<Vec<&'a CatalogStar>> {
        for name in &asterism.members {
            if let Err(e) = self.catalog.lookup(name) {
                log::warn!("Skipping asterism {}: {}", asterism.constellation, e);
                return None;
            }
        }

        let mut members: Vec<&CatalogStar> = self
            .catalog
            .in_constellation(&asterism.constellation)
            .filter(|star| asterism.members.contains(&star.name))
            .collect();
        if members.len() != asterism.members.len() {
            log::warn!(
                "Skipping asterism {}: members outside the constellation",
                asterism.constellation
            );
            return None;
        }
        members.sort_by(|a, b| a.magnitude.total_cmp(&b.magnitude));
        Some(members)
    }
}

/// Detections ordered brightest first, using pixel area as the brightness
/// proxy. Stable on ties.
fn brightest_first(detected: &[DetectedStar]) -> Vec<&DetectedStar> {
    let mut ranked: Vec<&DetectedStar> = detected.iter().collect();
    ranked.sort_by(|a, b| b.pixel_area.cmp(&a.pixel_area));
    ranked
}

impl PatternMatcher for HeuristicMatcher {
    fn identify(&self, detected: &[DetectedStar], image_size: ImageSize) -> Vec<PatternMatch> {
        if detected.len() < MIN_PATTERN_STARS {
            return Vec::new();
        }

        log::info!(
            "Simulating geometric pattern analysis of {} stars in {} frame...",
            detected.len(),
            image_size
        );
        if !self.search_delay.is_zero() {
            thread::sleep(self.search_delay);
        }

        let ranked = brightest_first(detected);
        let mut rng = rand::rng();
        let mut matches = Vec::new();

        for asterism in &self.asterisms {
            if detected.len() < asterism.min_detections {
                continue;
            }
            let Some(members) = self.ranked_members(asterism) else {
                continue;
            };

            let matched_stars = ranked
                .iter()
                .zip(members)
                .map(|(&source, catalog_star)| MatchedStar {
                    detected: *source,
                    catalog_star: catalog_star.clone(),
                })
                .collect();

            let jitter = if asterism.confidence_jitter > 0.0 {
                rng.random_range(-asterism.confidence_jitter..=asterism.confidence_jitter)
            } else {
                0.0
            };

            log::info!("Found a pattern resembling {}.", asterism.constellation);
            matches.push(PatternMatch {
                constellation: asterism.constellation.clone(),
                confidence: (asterism.base_confidence + jitter).clamp(0.0, 1.0),
                matched_stars,
                description: asterism.description.clone(),
            });
        }

        if matches.is_empty() {
            log::info!("No distinct patterns found in the image.");
        }
        matches
    }
}
