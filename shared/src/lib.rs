//! Shared components for the ground station star tracker.
//!
//! Holds the image processing half of the analysis pipeline: intensity
//! conversion, Gaussian smoothing, thresholding, connected-component labeling
//! and the star detector built from them.

pub mod image_proc;
pub mod image_size;

pub use image_proc::detection::{detect_stars, detect_stars_in_intensity};
pub use image_size::ImageSize;
