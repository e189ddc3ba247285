//! Tract density maps and density-based outlier removal for finished
//! tractograms.
//!
//! Streamlines that mostly run through voxels few other streamlines visit
//! are treated as outliers: [`filter_by_density`] keeps a fibre only when a
//! sufficient fraction of its points lies in voxels whose normalised
//! density exceeds a threshold.
use crate::types::Streamline;
use crate::volume::{GridGeometry, ScalarVolume, VoxelField};
use log::debug;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Segments are rasterised in sub-steps of this fraction of the smallest
/// voxel size.
const RASTER_STEP_FRACTION: f32 = 0.25;

/// Outlier filter settings.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityFilterParams {
    /// Normalised density a point must exceed to count as supported.
    pub threshold: f32,
    /// Minimum fraction of supported points for a fibre to be kept.
    pub overlap: f32,
    /// Trilinear density lookup instead of nearest voxel.
    pub interpolate: bool,
    /// When fewer fibres survive, the result is empty.
    pub min_fibers: usize,
}

impl Default for DensityFilterParams {
    fn default() -> Self {
        Self {
            threshold: 0.05,
            overlap: 0.5,
            interpolate: true,
            min_fibers: 0,
        }
    }
}

/// Number of fibres passing through each voxel of `geometry`.
///
/// Each fibre counts at most once per voxel. With `binary` the result is 1
/// wherever any fibre passes, otherwise counts are divided by the maximum.
pub fn tract_density(fibers: &[Streamline], geometry: &GridGeometry, binary: bool) -> ScalarVolume {
    let mut map = ScalarVolume::zeros(geometry.clone());
    let raster_step = (RASTER_STEP_FRACTION * geometry.min_spacing()).max(f32::EPSILON);
    let buffer = map.as_mut_slice();
    let mut visited = HashSet::new();
    for fiber in fibers {
        visited.clear();
        let mut mark = |p: &Point3<f32>| {
            if let Some(i) = geometry.checked_linear_index(geometry.world_to_index(p)) {
                visited.insert(i);
            }
        };
        if let Some(first) = fiber.front() {
            mark(first);
        }
        for (a, b) in fiber.points.iter().zip(fiber.points.iter().skip(1)) {
            let seg = b - a;
            let n = (seg.norm() / raster_step).ceil().max(1.0) as usize;
            for k in 1..=n {
                mark(&(a + seg * (k as f32 / n as f32)));
            }
        }
        for &i in &visited {
            buffer[i] += 1.0;
        }
    }

    let max = buffer.iter().copied().fold(0.0f32, f32::max);
    if max > 0.0 {
        for v in buffer.iter_mut() {
            *v = if binary {
                if *v > 0.0 {
                    1.0
                } else {
                    0.0
                }
            } else {
                *v / max
            };
        }
    }
    debug!(
        "tract_density: {} fibers, peak count {max}, binary={binary}",
        fibers.len()
    );
    map
}

/// Fraction of the fibre's points whose density exceeds `threshold`.
pub fn density_overlap(fiber: &Streamline, density: &ScalarVolume, threshold: f32, interpolate: bool) -> f32 {
    if fiber.is_empty() {
        return 0.0;
    }
    let supported = fiber
        .points
        .iter()
        .filter(|p| density.sample(p, interpolate) > threshold)
        .count();
    supported as f32 / fiber.len() as f32
}

/// Fibres sufficiently supported by `density`, in input order.
pub fn filter_by_density(
    fibers: &[Streamline],
    density: &ScalarVolume,
    params: &DensityFilterParams,
) -> Vec<Streamline> {
    let kept: Vec<Streamline> = fibers
        .iter()
        .filter(|f| density_overlap(f, density, params.threshold, params.interpolate) >= params.overlap)
        .cloned()
        .collect();
    debug!(
        "filter_by_density: kept {}/{} fibers (grid {:?})",
        kept.len(),
        fibers.len(),
        density.geometry().dims
    );
    if kept.len() < params.min_fibers {
        return Vec::new();
    }
    kept
}
