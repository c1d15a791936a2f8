//! Image thresholding and connected-component labeling
//!
//! Turns a smoothed intensity map into labeled regions of bright pixels and
//! reduces each region to its area and centroid.

use ndarray::{Array2, ArrayView2};

/// 8-connectivity neighbour offsets (dy, dx)
const NEIGHBORS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Area and centroid of one labeled component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentStats {
    /// Label in the image returned by [`connected_components`] (1-based)
    pub label: u32,
    /// Number of member pixels
    pub area: usize,
    /// Unweighted mean column of the member pixels
    pub centroid_x: f64,
    /// Unweighted mean row of the member pixels
    pub centroid_y: f64,
}

/// Apply thresholding to an image and return a binary mask
///
/// A pixel is set iff its value is strictly greater than `threshold`.
pub fn apply_threshold(image: ArrayView2<f64>, threshold: f64) -> Array2<bool> {
    image.mapv(|v| v > threshold)
}

/// Find connected components in a binary mask
///
/// Uses an 8-connectivity flood fill. Returns the label image (0 for
/// background, 1..=n for components) and the number of components n.
pub fn connected_components(mask: ArrayView2<bool>) -> (Array2<u32>, u32) {
    let (rows, cols) = mask.dim();
    let mut labels = Array2::zeros((rows, cols));
    let mut label_counter = 0;
    let mut stack = Vec::new();

    for i in 0..rows {
        for j in 0..cols {
            if !mask[[i, j]] || labels[[i, j]] != 0 {
                continue;
            }

            label_counter += 1;
            labels[[i, j]] = label_counter;
            stack.push((i, j));

            while let Some((y, x)) = stack.pop() {
                for &(dy, dx) in &NEIGHBORS {
                    let ny = y as isize + dy;
                    let nx = x as isize + dx;
                    if ny < 0 || ny >= rows as isize || nx < 0 || nx >= cols as isize {
                        continue;
                    }

                    let (ny, nx) = (ny as usize, nx as usize);
                    if mask[[ny, nx]] && labels[[ny, nx]] == 0 {
                        labels[[ny, nx]] = label_counter;
                        stack.push((ny, nx));
                    }
                }
            }
        }
    }

    (labels, label_counter)
}

/// Compute area and centroid for every label in a single pass.
///
/// The returned vector is indexed by `label - 1`.
pub fn component_stats(labels: ArrayView2<u32>, num_labels: u32) -> Vec<ComponentStats> {
    let mut sums = vec![(0usize, 0.0f64, 0.0f64); num_labels as usize];

    for ((y, x), &label) in labels.indexed_iter() {
        if label == 0 {
            continue;
        }
        let entry = &mut sums[(label - 1) as usize];
        entry.0 += 1;
        entry.1 += x as f64;
        entry.2 += y as f64;
    }

    sums.into_iter()
        .enumerate()
        .filter(|(_, (area, _, _))| *area > 0)
        .map(|(idx, (area, sum_x, sum_y))| ComponentStats {
            label: idx as u32 + 1,
            area,
            centroid_x: sum_x / area as f64,
            centroid_y: sum_y / area as f64,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_apply_threshold() {
        let image = arr2(&[[0.1, 0.9], [0.8, 0.5]]);

        let mask = apply_threshold(image.view(), 0.5);

        assert!(!mask[[0, 0]]);
        assert!(mask[[0, 1]]);
        assert!(mask[[1, 0]]);
        // Strictly greater than
        assert!(!mask[[1, 1]]);
    }

    #[test]
    fn test_connected_components() {
        let mask = arr2(&[
            [false, true, true, false],
            [false, true, false, false],
            [false, false, false, true],
            [false, false, true, true],
        ]);

        let (labels, num_labels) = connected_components(mask.view());

        assert_eq!(num_labels, 2);

        let label1 = labels[[0, 1]];
        let label2 = labels[[2, 3]];
        assert!(label1 > 0);
        assert!(label2 > 0);
        assert_ne!(label1, label2);

        assert_eq!(labels[[0, 1]], labels[[0, 2]]);
        assert_eq!(labels[[0, 1]], labels[[1, 1]]);

        assert_eq!(labels[[2, 3]], labels[[3, 3]]);
        assert_eq!(labels[[2, 3]], labels[[3, 2]]);
        assert_eq!(labels[[0, 0]], 0);
    }

    #[test]
    fn test_diagonal_pixels_are_connected() {
        let mask = arr2(&[[true, false, false], [false, true, false], [false, false, true]]);

        let (_, num_labels) = connected_components(mask.view());
        assert_eq!(num_labels, 1);
    }

    #[test]
    fn test_component_stats() {
        let labels = arr2(&[[1, 1, 0, 0], [1, 1, 0, 0], [0, 0, 0, 2], [0, 0, 2, 2]]);

        let stats = component_stats(labels.view(), 2);

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].label, 1);
        assert_eq!(stats[0].area, 4);
        assert_eq!(stats[0].centroid_x, 0.5);
        assert_eq!(stats[0].centroid_y, 0.5);

        assert_eq!(stats[1].area, 3);
        assert!((stats[1].centroid_x - 8.0 / 3.0).abs() < 1e-12);
        assert!((stats[1].centroid_y - 8.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_mask_has_no_components() {
        let mask = Array2::from_elem((5, 5), false);
        let (labels, num_labels) = connected_components(mask.view());
        assert_eq!(num_labels, 0);
        assert!(component_stats(labels.view(), num_labels).is_empty());
    }
}
