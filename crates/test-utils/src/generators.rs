//! Test data generators for synthetic DN and QA rasters.
//!
//! These generators create predictable, verifiable patterns so that tests
//! can check exactly which reflectance values reach the output cube.

use ndarray::Array2;

/// Landsat QA_PIXEL value of a clear land pixel.
pub const LANDSAT_CLEAR: i32 = 21824;

/// Landsat QA_PIXEL value with the cloud bit set.
pub const LANDSAT_CLOUD: i32 = 1 << 3;

/// Landsat DN that is fill and converts to NaN.
pub const LANDSAT_FILL: i32 = 0;

/// Creates a DN tile with a constant value.
///
/// # Example
///
/// ```
/// use test_utils::constant_tile;
///
/// let tile = constant_tile((2, 3), 7);
/// assert_eq!(tile.dim(), (2, 3));
/// assert!(tile.iter().all(|&v| v == 7));
/// ```
pub fn constant_tile(shape: (usize, usize), value: i32) -> Array2<i32> {
    Array2::from_elem(shape, value)
}

/// Creates a DN tile where each cell is `base + col * 10 + row`.
///
/// This makes it easy to verify that pixels land in the right place
/// after stacking.
///
/// # Example
///
/// ```
/// use test_utils::gradient_tile;
///
/// let tile = gradient_tile((3, 4), 1000);
/// assert_eq!(tile[[0, 0]], 1000);
/// assert_eq!(tile[[0, 1]], 1010);
/// assert_eq!(tile[[2, 0]], 1002);
/// ```
pub fn gradient_tile(shape: (usize, usize), base: i32) -> Array2<i32> {
    Array2::from_shape_fn(shape, |(row, col)| base + col as i32 * 10 + row as i32)
}

/// Landsat QA tile that is clear except for the given columns, which are
/// flagged as cloud.
pub fn landsat_qa_tile(shape: (usize, usize), cloudy_cols: &[usize]) -> Array2<i32> {
    Array2::from_shape_fn(shape, |(_, col)| {
        if cloudy_cols.contains(&col) {
            LANDSAT_CLOUD
        } else {
            LANDSAT_CLEAR
        }
    })
}

/// Expected Landsat Collection 2 reflectance for a DN.
pub fn landsat_reflectance(dn: i32) -> f32 {
    if dn == LANDSAT_FILL {
        f32::NAN
    } else {
        (dn as f32 * 0.000_027_5 - 0.2).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;

    #[test]
    fn test_gradient_tile_pattern() {
        let tile = gradient_tile((5, 5), 0);
        for ((row, col), &v) in tile.indexed_iter() {
            assert_eq!(v, col as i32 * 10 + row as i32);
        }
    }

    #[test]
    fn test_landsat_qa_tile_columns() {
        let qa = landsat_qa_tile((2, 4), &[0, 3]);
        assert_eq!(qa[[1, 0]], LANDSAT_CLOUD);
        assert_eq!(qa[[1, 1]], LANDSAT_CLEAR);
        assert_eq!(qa[[0, 3]], LANDSAT_CLOUD);
    }

    #[test]
    fn test_landsat_reflectance() {
        assert_approx_eq!(landsat_reflectance(10_000), 0.075, 1e-6);
        assert_eq!(landsat_reflectance(1), 0.0);
        assert!(landsat_reflectance(LANDSAT_FILL).is_nan());
    }
}
