//! Reference star catalog.

use std::collections::HashMap;

use shared_wasm::CatalogStar;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Star '{0}' not found in catalog")]
    NotFound(String),
}

/// (name, magnitude, ra_deg, dec_deg, constellation)
const BUILTIN_STARS: [(&str, f64, f64, f64, &str); 8] = [
    ("Sirius", -1.46, 101.287, -16.716, "Canis Major"),
    ("Rigel", 0.13, 78.634, -8.202, "Orion"),
    ("Betelgeuse", 0.50, 88.793, 7.407, "Orion"),
    ("Mintaka", 2.25, 83.002, -0.299, "Orion"),
    ("Alnilam", 1.69, 84.053, -1.202, "Orion"),
    ("Alnitak", 1.74, 85.190, -1.943, "Orion"),
    ("Dubhe", 1.81, 165.932, 61.751, "Ursa Major"),
    ("Merak", 2.34, 165.460, 56.382, "Ursa Major"),
];

/// Immutable table of reference stars keyed by name.
///
/// There is no mutation API; build a new catalog with [`Catalog::from_stars`]
/// when a different table is needed.
#[derive(Debug, Clone)]
pub struct Catalog {
    stars: Vec<CatalogStar>,
    by_name: HashMap<String, usize>,
}

impl Catalog {
    /// The fixed built-in bright-star table.
    pub fn builtin() -> Self {
        let catalog = Self::from_stars(BUILTIN_STARS.iter().map(
            |&(name, magnitude, ra, dec, constellation)| CatalogStar {
                name: name.to_string(),
                magnitude,
                right_ascension_deg: ra,
                declination_deg: dec,
                constellation: constellation.to_string(),
            },
        ));
        log::info!("Loaded {} built-in stars into catalog.", catalog.len());
        catalog
    }

    /// Build a catalog from arbitrary entries. A repeated name replaces the
    /// earlier entry in place.
    pub fn from_stars(stars: impl IntoIterator<Item = CatalogStar>) -> Self {
        let mut catalog = Self {
            stars: Vec::new(),
            by_name: HashMap::new(),
        };
        for star in stars {
            match catalog.by_name.get(&star.name) {
                Some(&idx) => catalog.stars[idx] = star,
                None => {
                    catalog.by_name.insert(star.name.clone(), catalog.stars.len());
                    catalog.stars.push(star);
                }
            }
        }
        catalog
    }

    pub fn lookup(&self, name: &str) -> Result<&CatalogStar, CatalogError> {
        self.by_name
            .get(name)
            .map(|&idx| &self.stars[idx])
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))
    }

    /// All entries, in load order.
    pub fn all(&self) -> &[CatalogStar] {
        &self.stars
    }

    pub fn in_constellation<'a>(
        &'a self,
        constellation: &'a str,
    ) -> impl Iterator<Item = &'a CatalogStar> + 'a {
        self.stars
            .iter()
            .filter(move |s| s.constellation == constellation)
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
