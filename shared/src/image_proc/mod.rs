//! Image processing for star detection
//!
//! Converts decoded images into intensity maps, suppresses pixel noise with a
//! Gaussian low-pass filter, binarizes against a threshold and extracts
//! connected components as point-source candidates.

pub mod detection;
pub mod intensity;
pub mod smoothing;
pub mod thresholding;

pub use detection::{detect_stars, detect_stars_in_intensity, SMOOTHING_SIGMA};
pub use intensity::{array2_to_gray_image, to_intensity};
pub use smoothing::{gaussian_blur, gaussian_kernel_1d};
pub use thresholding::{apply_threshold, component_stats, connected_components, ComponentStats};
