//! End-to-end tracking on synthetic star fields

use std::time::Duration;

use image::{DynamicImage, GrayImage, Luma};
use shared::ImageSize;
use shared_wasm::DetectionSettings;
use track::{StarTracker, NOMINAL_ORBITAL_ALTITUDE_KM};

/// Gray frame with a 3x3 block of 255 at each (x, y) center
fn star_field(width: u32, height: u32, centers: &[(u32, u32)]) -> DynamicImage {
    let mut img = GrayImage::new(width, height);
    for &(cx, cy) in centers {
        for y in cy - 1..=cy + 1 {
            for x in cx - 1..=cx + 1 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
    }
    DynamicImage::ImageLuma8(img)
}

fn tracker() -> StarTracker {
    StarTracker::new(DetectionSettings::default(), Duration::ZERO)
}

#[test]
fn test_five_star_field_resolves_orion() {
    let _ = env_logger::builder().is_test(true).try_init();

    let image = star_field(
        200,
        150,
        &[(20, 20), (60, 40), (100, 80), (150, 30), (180, 120)],
    );
    let tracker = tracker();

    let detected = tracker.detect_stars(&image);
    assert_eq!(detected.len(), 5);

    let solution =
        tracker.identify_constellations_and_position(ImageSize::of_image(&image), &detected);

    assert_eq!(solution.patterns.len(), 1);
    assert_eq!(solution.patterns[0].constellation, "Orion");

    let attitude = solution.attitude.as_ref().expect("attitude for a match");
    let position = solution.position.expect("position for an attitude");
    assert_eq!(position.latitude, attitude.pointing_dec);
    assert_eq!(position.longitude, attitude.pointing_ra - 180.0);
    assert_eq!(position.altitude, NOMINAL_ORBITAL_ALTITUDE_KM);
    assert_eq!(solution.summary(), "Analysis complete. Found 1 patterns.");
}

#[test]
fn test_sparse_field_has_no_solution() {
    let image = star_field(120, 120, &[(20, 20), (60, 60), (100, 100)]);
    let tracker = tracker();

    let detected = tracker.detect_stars(&image);
    assert_eq!(detected.len(), 3);

    let solution =
        tracker.identify_constellations_and_position(ImageSize::of_image(&image), &detected);
    assert!(solution.patterns.is_empty());
    assert!(solution.attitude.is_none());
    assert!(solution.position.is_none());
}

#[test]
fn test_dark_frame_detects_nothing() {
    let image = star_field(64, 64, &[]);
    assert!(tracker().detect_stars(&image).is_empty());
}
