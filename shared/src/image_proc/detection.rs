//! Threshold-and-label star detection.
//!
//! Pipeline: intensity map -> Gaussian smoothing -> binarize -> 8-connected
//! components -> area filter -> unweighted centroids. Pure functions of the
//! image and settings; result order follows label order and callers must not
//! depend on it.

use image::DynamicImage;
use ndarray::ArrayView2;
use shared_wasm::{DetectedStar, DetectionSettings};

use super::intensity::to_intensity;
use super::smoothing::gaussian_blur;
use super::thresholding::{apply_threshold, component_stats, connected_components};

/// Fixed smoothing radius (Gaussian sigma, pixels) applied before thresholding.
pub const SMOOTHING_SIGMA: f64 = 1.0;

/// Detect point sources in a decoded image.
pub fn detect_stars(image: &DynamicImage, settings: &DetectionSettings) -> Vec<DetectedStar> {
    let intensity = to_intensity(image);
    detect_stars_in_intensity(intensity.view(), settings)
}

/// Detect point sources in a single-channel intensity map indexed `[y, x]`.
pub fn detect_stars_in_intensity(
    intensity: ArrayView2<f64>,
    settings: &DetectionSettings,
) -> Vec<DetectedStar> {
    let smoothed = gaussian_blur(intensity, SMOOTHING_SIGMA);
    let mask = apply_threshold(smoothed.view(), settings.threshold);
    let (labels, num_labels) = connected_components(mask.view());

    let stars: Vec<DetectedStar> = component_stats(labels.view(), num_labels)
        .into_iter()
        .filter(|c| (settings.min_area..=settings.max_area).contains(&c.area))
        .map(|c| DetectedStar::new(c.centroid_x, c.centroid_y, c.area))
        .collect();

    log::debug!(
        "Detection kept {} of {} components (threshold {:.1}, area {}..={})",
        stars.len(),
        num_labels,
        settings.threshold,
        settings.min_area,
        settings.max_area
    );

    stars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_proc::intensity::array2_to_gray_image;
    use ndarray::Array2;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    const BLOB_CENTERS: [(usize, usize); 5] = [(15, 20), (50, 50), (80, 25), (30, 75), (75, 80)];

    /// 100x100 frame with 3x3 blobs of 255 on a zero background, centers (x, y)
    fn five_blob_frame() -> Array2<u8> {
        let mut frame = Array2::<u8>::zeros((100, 100));
        for &(cx, cy) in &BLOB_CENTERS {
            for y in cy - 1..=cy + 1 {
                for x in cx - 1..=cx + 1 {
                    frame[[y, x]] = 255;
                }
            }
        }
        frame
    }

    #[test]
    fn test_five_blobs_detected() {
        let frame = five_blob_frame();
        let image = DynamicImage::ImageLuma8(array2_to_gray_image(&frame));

        let stars = detect_stars(&image, &DetectionSettings::default());

        assert_eq!(stars.len(), 5);
        for star in &stars {
            assert!(star.pixel_area >= 5);
        }
        for &(cx, cy) in &BLOB_CENTERS {
            let hit = stars.iter().any(|s| {
                (s.x() - cx as f64).abs() <= 1.0 && (s.y() - cy as f64).abs() <= 1.0
            });
            assert!(hit, "no detection near blob at ({cx}, {cy}): {stars:?}");
        }
    }

    #[test]
    fn test_nothing_above_threshold_yields_no_stars() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for &threshold in &[0.0, 12.5, 100.0, 254.0] {
            // Noise strictly at or below the threshold
            let intensity =
                Array2::from_shape_fn((40, 60), |_| rng.random_range(0.0..=1.0) * threshold);
            let settings = DetectionSettings {
                threshold,
                min_area: 1,
                max_area: usize::MAX,
            };

            let stars = detect_stars_in_intensity(intensity.view(), &settings);
            assert!(stars.is_empty(), "threshold {threshold}: {stars:?}");
        }
    }

    #[test]
    fn test_blank_image_yields_empty() {
        let intensity = Array2::<f64>::zeros((32, 32));
        let stars = detect_stars_in_intensity(intensity.view(), &DetectionSettings::default());
        assert!(stars.is_empty());
    }

    #[test]
    fn test_area_filter_rejects_speckles_and_blobs() {
        let mut frame = Array2::<f64>::zeros((120, 120));
        // Single hot pixel smooths below threshold or to a tiny component
        frame[[10, 10]] = 255.0;
        // Saturated 30x30 region, far larger than max_area
        for y in 60..90 {
            for x in 60..90 {
                frame[[y, x]] = 255.0;
            }
        }
        // One proper star
        for y in 19..=21 {
            for x in 99..=101 {
                frame[[y, x]] = 255.0;
            }
        }

        let stars = detect_stars_in_intensity(frame.view(), &DetectionSettings::default());

        assert_eq!(stars.len(), 1, "{stars:?}");
        assert!((stars[0].x() - 100.0).abs() < 1e-9);
        assert!((stars[0].y() - 20.0).abs() < 1e-9);
        assert_eq!(stars[0].pixel_area, 9);
    }

    #[test]
    fn test_smoothing_merges_noise_fragments() {
        // A checkerboard patch would be many 1-pixel components without smoothing
        let mut frame = Array2::<f64>::zeros((30, 30));
        for y in 12..18 {
            for x in 12..18 {
                if (x + y) % 2 == 0 {
                    frame[[y, x]] = 255.0;
                }
            }
        }

        let stars = detect_stars_in_intensity(frame.view(), &DetectionSettings::default());
        assert_eq!(stars.len(), 1, "{stars:?}");
    }
}
