//! Conversions between decoded images and intensity arrays.

use image::{DynamicImage, GrayImage, Luma};
use ndarray::Array2;

/// Converts any decoded image into a single-channel intensity map.
///
/// Color images are reduced to luma first. The result is indexed `[y, x]`
/// with shape (height, width) and values in 0.0 - 255.0.
pub fn to_intensity(image: &DynamicImage) -> Array2<f64> {
    let gray = image.to_luma8();
    let (width, height) = gray.dimensions();

    Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
        gray.get_pixel(x as u32, y as u32)[0] as f64
    })
}

/// Converts an ndarray Array2<u8> to an image::GrayImage
///
/// Array indices [y, x] map to pixel coordinates (x, y). Note that array
/// dimensions are (height, width) while image dimensions are (width, height).
pub fn array2_to_gray_image(arr: &Array2<u8>) -> GrayImage {
    let (height, width) = arr.dim();
    let mut img = GrayImage::new(width as u32, height as u32);

    for ((y, x), &value) in arr.indexed_iter() {
        img.put_pixel(x as u32, y as u32, Luma([value]));
    }

    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_gray_round_trip_preserves_layout() {
        let mut arr = Array2::<u8>::zeros((3, 5));
        arr[[2, 4]] = 200;
        arr[[0, 1]] = 17;

        let img = array2_to_gray_image(&arr);
        assert_eq!(img.dimensions(), (5, 3));
        assert_eq!(img.get_pixel(4, 2)[0], 200);

        let intensity = to_intensity(&DynamicImage::ImageLuma8(img));
        assert_eq!(intensity.dim(), (3, 5));
        assert_eq!(intensity[[2, 4]], 200.0);
        assert_eq!(intensity[[0, 1]], 17.0);
        assert_eq!(intensity[[1, 1]], 0.0);
    }

    #[test]
    fn test_white_rgb_pixel_is_full_intensity() {
        let mut rgb = RgbImage::new(4, 4);
        rgb.put_pixel(1, 2, Rgb([255, 255, 255]));

        let intensity = to_intensity(&DynamicImage::ImageRgb8(rgb));
        assert_eq!(intensity[[2, 1]], 255.0);
        assert_eq!(intensity[[0, 0]], 0.0);
    }
}
