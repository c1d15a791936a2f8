//! Image dimensions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Width and height of an analyzed frame in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: usize,
    pub height: usize,
}

impl ImageSize {
    pub fn from_width_height(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Dimensions of a decoded image.
    pub fn of_image(image: &image::DynamicImage) -> Self {
        Self::from_width_height(image.width() as usize, image.height() as usize)
    }

    /// Dimensions of a row-major (height, width) intensity array.
    pub fn of_array<T>(array: &ndarray::ArrayView2<T>) -> Self {
        let (height, width) = array.dim();
        Self { width, height }
    }
}

impl From<(usize, usize)> for ImageSize {
    fn from(dimensions: (usize, usize)) -> Self {
        Self::from_width_height(dimensions.0, dimensions.1)
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_array_dims_are_row_major() {
        let array = Array2::<f64>::zeros((30, 40));
        let size = ImageSize::of_array(&array.view());
        assert_eq!(size, ImageSize::from_width_height(40, 30));
        assert_eq!(size.to_string(), "40x30");
    }

    #[test]
    fn test_from_tuple_is_width_then_height() {
        let size: ImageSize = (10, 5).into();
        assert_eq!(size.width, 10);
        assert_eq!(size.height, 5);
    }
}
