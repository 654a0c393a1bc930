//! Coarse-pixel footprint maps on the fine grid.
//!
//! For a sensor band group with native resolution coarser than the output
//! grid, every fine pixel is labeled with the row-major id of the coarse
//! pixel it falls in. The map uses the narrowest unsigned type able to hold
//! every id while keeping the type's maximum free as the invalid sentinel.
//! Coarse pixels that lie mostly outside the field are set to the sentinel.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use eo_common::GeoTransform;
use ndarray::Array2;
use serde::Serialize;

use crate::error::FootprintError;
use crate::profile::SensorProfile;

/// Default minimum share of in-field fine pixels for a footprint to be kept.
pub const DEFAULT_MIN_VALID_FRACTION: f64 = 0.5;

/// Footprint id grid, stored at the narrowest fitting width.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FootprintMap {
    U8(Array2<u8>),
    U16(Array2<u16>),
    U32(Array2<u32>),
}

impl FootprintMap {
    /// Reserved invalid id: the maximum of the stored type.
    pub fn sentinel(&self) -> u32 {
        match self {
            FootprintMap::U8(_) => u8::MAX as u32,
            FootprintMap::U16(_) => u16::MAX as u32,
            FootprintMap::U32(_) => u32::MAX,
        }
    }

    pub fn bits(&self) -> u32 {
        match self {
            FootprintMap::U8(_) => 8,
            FootprintMap::U16(_) => 16,
            FootprintMap::U32(_) => 32,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        match self {
            FootprintMap::U8(a) => a.dim(),
            FootprintMap::U16(a) => a.dim(),
            FootprintMap::U32(a) => a.dim(),
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Option<u32> {
        match self {
            FootprintMap::U8(a) => a.get((row, col)).map(|&v| v as u32),
            FootprintMap::U16(a) => a.get((row, col)).map(|&v| v as u32),
            FootprintMap::U32(a) => a.get((row, col)).copied(),
        }
    }

    /// Widened copy of the ids.
    pub fn to_u32(&self) -> Array2<u32> {
        match self {
            FootprintMap::U8(a) => a.mapv(u32::from),
            FootprintMap::U16(a) => a.mapv(u32::from),
            FootprintMap::U32(a) => a.clone(),
        }
    }

    /// Distinct ids, sentinel excluded.
    pub fn distinct_ids(&self) -> BTreeSet<u32> {
        let sentinel = self.sentinel();
        self.to_u32()
            .iter()
            .copied()
            .filter(|&id| id != sentinel)
            .collect()
    }

    /// Number of fine pixels carrying the sentinel.
    pub fn sentinel_count(&self) -> usize {
        let sentinel = self.sentinel();
        self.to_u32().iter().filter(|&&id| id == sentinel).count()
    }
}

/// Compute the footprint map of one native resolution.
///
/// `validity` marks in-field fine pixels with `true`. Edge filtering only
/// applies when a mask is given and `native_res > target_res`; a footprint
/// whose in-field share is exactly `min_valid_fraction` is kept.
pub fn footprint_map(
    geotransform: &GeoTransform,
    shape: (usize, usize),
    native_res: f64,
    target_res: f64,
    validity: Option<&Array2<bool>>,
    min_valid_fraction: f64,
) -> Result<FootprintMap, FootprintError> {
    let (height, width) = shape;
    let pixel_size = geotransform.pixel_size();
    if !(pixel_size.is_finite() && pixel_size > 0.0) {
        return Err(FootprintError::InvalidPixelSize(pixel_size));
    }
    if !(native_res.is_finite() && native_res > 0.0) {
        return Err(FootprintError::InvalidResolution(native_res));
    }
    if let Some(mask) = validity {
        if mask.dim() != shape {
            return Err(FootprintError::MaskShape {
                mask: mask.dim(),
                grid: shape,
            });
        }
    }

    let n_cols = ((width as f64 * pixel_size) / native_res).ceil().max(1.0) as u64;
    let n_rows = ((height as f64 * pixel_size) / native_res).ceil().max(1.0) as u64;
    let n_total = n_rows * n_cols;
    if n_total >= u32::MAX as u64 {
        return Err(FootprintError::TooManyFootprints(n_total));
    }

    let ratio = native_res / pixel_size;
    let coarse = |i: usize, n: u64| -> u64 { ((i as f64 / ratio).floor() as u64).min(n - 1) };
    let col_ids: Vec<u64> = (0..width).map(|c| coarse(c, n_cols)).collect();
    let row_ids: Vec<u64> = (0..height).map(|r| coarse(r, n_rows)).collect();

    let mut ids: Array2<u32> =
        Array2::from_shape_fn(shape, |(r, c)| (row_ids[r] * n_cols + col_ids[c]) as u32);

    let sentinel = if n_total <= u8::MAX as u64 - 1 {
        u8::MAX as u32
    } else if n_total <= u16::MAX as u64 - 1 {
        u16::MAX as u32
    } else {
        u32::MAX
    };

    if let Some(mask) = validity {
        if native_res > target_res {
            exclude_edges(&mut ids, mask, min_valid_fraction, sentinel);
        }
    }

    Ok(narrow(ids, sentinel))
}

fn exclude_edges(ids: &mut Array2<u32>, valid: &Array2<bool>, min_fraction: f64, sentinel: u32) {
    let mut counts: HashMap<u32, (u64, u64)> = HashMap::new();
    for (&id, &ok) in ids.iter().zip(valid.iter()) {
        let entry = counts.entry(id).or_insert((0, 0));
        entry.0 += 1;
        if ok {
            entry.1 += 1;
        }
    }

    let dropped: BTreeSet<u32> = counts
        .into_iter()
        .filter(|&(_, (total, inside))| total > 0 && (inside as f64 / total as f64) < min_fraction)
        .map(|(id, _)| id)
        .collect();

    if !dropped.is_empty() {
        ids.mapv_inplace(|id| if dropped.contains(&id) { sentinel } else { id });
    }
}

fn narrow(ids: Array2<u32>, sentinel: u32) -> FootprintMap {
    if sentinel == u8::MAX as u32 {
        FootprintMap::U8(ids.mapv(|v| v as u8))
    } else if sentinel == u16::MAX as u32 {
        FootprintMap::U16(ids.mapv(|v| v as u16))
    } else {
        FootprintMap::U32(ids)
    }
}

/// One footprint map per native resolution declared by `profile`.
pub fn footprint_maps(
    profile: &SensorProfile,
    geotransform: &GeoTransform,
    shape: (usize, usize),
    validity: Option<&Array2<bool>>,
    min_valid_fraction: f64,
) -> Result<BTreeMap<u32, FootprintMap>, FootprintError> {
    let mut maps = BTreeMap::new();
    for native in profile.native_resolutions() {
        let map = footprint_map(
            geotransform,
            shape,
            native as f64,
            profile.target_resolution as f64,
            validity,
            min_valid_fraction,
        )?;
        maps.insert(native, map);
    }
    Ok(maps)
}
