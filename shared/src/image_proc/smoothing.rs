//! Gaussian low-pass filtering.
//!
//! Raw sensor and photo noise fragments single stars into several components
//! (or bridges neighbours into one) once the image is binarized, so the
//! detector always smooths first. The filter is separable: one 1-D pass along
//! rows, one along columns, with mirrored ("reflect") boundaries.

use ndarray::{Array2, ArrayView2, Axis};

/// Kernel half-width in units of sigma.
const TRUNCATE_SIGMAS: f64 = 4.0;

/// Normalized 1-D Gaussian kernel of radius `round(4 * sigma)`.
///
/// Returns `[1.0]` for a non-positive sigma, which makes the blur an identity.
pub fn gaussian_kernel_1d(sigma: f64) -> Vec<f64> {
    if sigma <= 0.0 {
        return vec![1.0];
    }

    let radius = (TRUNCATE_SIGMAS * sigma + 0.5) as isize;
    let two_sigma2 = 2.0 * sigma * sigma;
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|i| (-((i * i) as f64) / two_sigma2).exp())
        .collect();

    let sum: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|w| *w /= sum);
    kernel
}

/// Maps an out-of-range index back into `0..n` by mirroring about the edges
/// (`d c b a | a b c d | d c b a`).
fn reflect_index(i: isize, n: usize) -> usize {
    let period = 2 * n as isize;
    let m = i.rem_euclid(period);
    if m < n as isize {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}

fn convolve_axis(image: ArrayView2<f64>, kernel: &[f64], axis: Axis) -> Array2<f64> {
    let radius = (kernel.len() / 2) as isize;
    let len = image.len_of(axis);
    let mut out = Array2::zeros(image.raw_dim());

    for (src, mut dst) in image
        .lanes(axis)
        .into_iter()
        .zip(out.lanes_mut(axis).into_iter())
    {
        for (i, value) in dst.iter_mut().enumerate() {
            *value = kernel
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let j = reflect_index(i as isize + k as isize - radius, len);
                    w * src[j]
                })
                .sum();
        }
    }

    out
}

/// Blurs an intensity map with an isotropic Gaussian of the given sigma (px).
///
/// The output never exceeds the input maximum; rounding overshoot from the
/// weighted sums is clamped away so a pixel cannot cross a threshold that no
/// input pixel crossed.
pub fn gaussian_blur(image: ArrayView2<f64>, sigma: f64) -> Array2<f64> {
    if image.is_empty() {
        return image.to_owned();
    }

    let kernel = gaussian_kernel_1d(sigma);
    let rows = convolve_axis(image, &kernel, Axis(1));
    let mut blurred = convolve_axis(rows.view(), &kernel, Axis(0));

    let max = image.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    blurred.mapv_inplace(|v| v.min(max));
    blurred
}
