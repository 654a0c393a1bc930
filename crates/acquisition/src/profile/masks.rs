//! QA band decoders. Every function returns `true` where the pixel is
//! cloudy or otherwise unusable.

use ndarray::Array2;

/// Sentinel-2 SCL classes that are masked: no data, saturated, cloud shadow,
/// cloud medium/high probability, cirrus, snow.
pub const SCL_MASKED_CLASSES: [i32; 7] = [0, 1, 3, 8, 9, 10, 11];

#[inline]
fn bit(value: i32, n: u32) -> bool {
    (value as u32 >> n) & 1 == 1
}

/// Landsat QA_PIXEL: fill (0), cirrus (2), cloud (3), cloud shadow (4).
pub fn landsat_qa_pixel(qa: &Array2<i32>) -> Array2<bool> {
    qa.mapv(|v| bit(v, 0) || bit(v, 2) || bit(v, 3) || bit(v, 4))
}

/// MODIS state_1km: cloud state (bits 0-1 not clear), shadow (2),
/// internal cloud (10), adjacent cloud (13).
pub fn modis_state(qa: &Array2<i32>) -> Array2<bool> {
    qa.mapv(|v| (v & 0b11) != 0 || bit(v, 2) || bit(v, 10) || bit(v, 13))
}

/// VIIRS QF1: cloud confidence (bits 2-3), adjacent cloud (4).
pub fn viirs_qf1(qa: &Array2<i32>) -> Array2<bool> {
    qa.mapv(|v| (v & (0b11 << 2)) != 0 || bit(v, 4))
}

/// OLCI quality_flags: invalid (25), cloud (27), cloud ambiguous (28),
/// cloud margin (29), snow/ice (30).
pub fn olci_quality_flags(qa: &Array2<i32>) -> Array2<bool> {
    qa.mapv(|v| bit(v, 25) || bit(v, 27) || bit(v, 28) || bit(v, 29) || bit(v, 30))
}

/// Sentinel-2 scene classification fallback.
pub fn s2_scl(scl: &Array2<i32>) -> Array2<bool> {
    scl.mapv(|v| SCL_MASKED_CLASSES.contains(&v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_landsat_bits() {
        // 21824 is the usual clear-land QA_PIXEL value
        let qa = array![[21824, 1], [1 << 2, 1 << 3], [1 << 4, 1 << 6]];
        let mask = landsat_qa_pixel(&qa);
        assert_eq!(
            mask,
            array![[false, true], [true, true], [true, false]]
        );
    }

    #[test]
    fn test_modis_bits() {
        let qa = array![[0, 1, 2, 1 << 2, 1 << 10, 1 << 13, 1 << 5]];
        let mask = modis_state(&qa);
        assert_eq!(mask, array![[false, true, true, true, true, true, false]]);
    }

    #[test]
    fn test_viirs_bits() {
        let qa = array![[0, 1 << 2, 1 << 3, 1 << 4, 1 << 5, 0b11]];
        let mask = viirs_qf1(&qa);
        assert_eq!(mask, array![[false, true, true, true, false, false]]);
    }

    #[test]
    fn test_olci_bits() {
        let qa = array![[0, 1 << 25, 1 << 26, 1 << 27, 1 << 28, 1 << 29, 1 << 30]];
        let mask = olci_quality_flags(&qa);
        assert_eq!(
            mask,
            array![[false, true, false, true, true, true, true]]
        );
    }

    #[test]
    fn test_scl_classes() {
        let scl = array![[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]];
        let mask = s2_scl(&scl);
        assert_eq!(
            mask,
            array![[true, true, false, true, false, false, false, false, true, true, true, true]]
        );
    }
}
