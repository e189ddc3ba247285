//! Region masks consulted during tracking.
//!
//! Masks the caller did not provide are replaced by constant volumes on the
//! proposer grid before tracking starts: the tracking mask, seed and target
//! regions cover everything, stopping and exclusion regions cover nothing.
use crate::volume::{GridGeometry, ScalarVolume};
use nalgebra::Point3;
use std::borrow::Cow;

/// Optional user-supplied region images.
#[derive(Clone, Debug, Default)]
pub struct MaskInputs {
    /// Where tracking may proceed.
    pub tracking: Option<ScalarVolume>,
    /// Where streamlines terminate.
    pub stopping: Option<ScalarVolume>,
    /// Voxels seeded when no explicit seeds are given.
    pub seed: Option<ScalarVolume>,
    /// Target regions (or labels) evaluated by the endpoint constraint.
    pub target: Option<ScalarVolume>,
    /// Streamlines touching these regions are discarded.
    pub exclusion: Option<ScalarVolume>,
}

/// Fully resolved masks for one run.
#[derive(Clone, Debug)]
pub struct TrackingMasks<'a> {
    tracking: Cow<'a, ScalarVolume>,
    stopping: Cow<'a, ScalarVolume>,
    seed: Cow<'a, ScalarVolume>,
    target: Cow<'a, ScalarVolume>,
    exclusion: Cow<'a, ScalarVolume>,
    seed_set: bool,
    target_set: bool,
    exclusion_set: bool,
    interpolate: bool,
}

fn resolve<'a>(mask: &'a Option<ScalarVolume>, geometry: &GridGeometry, fill: f32) -> Cow<'a, ScalarVolume> {
    match mask {
        Some(volume) => Cow::Borrowed(volume),
        None => Cow::Owned(ScalarVolume::constant(geometry.clone(), fill)),
    }
}

impl<'a> TrackingMasks<'a> {
    pub fn resolve(inputs: &'a MaskInputs, geometry: &GridGeometry, interpolate: bool) -> Self {
        Self {
            tracking: resolve(&inputs.tracking, geometry, 1.0),
            stopping: resolve(&inputs.stopping, geometry, 0.0),
            seed: resolve(&inputs.seed, geometry, 1.0),
            target: resolve(&inputs.target, geometry, 1.0),
            exclusion: resolve(&inputs.exclusion, geometry, 0.0),
            seed_set: inputs.seed.is_some(),
            target_set: inputs.target.is_some(),
            exclusion_set: inputs.exclusion.is_some(),
            interpolate,
        }
    }

    pub fn seed_set(&self) -> bool {
        self.seed_set
    }

    pub fn target_set(&self) -> bool {
        self.target_set
    }

    pub fn exclusion_set(&self) -> bool {
        self.exclusion_set
    }

    pub fn interpolate(&self) -> bool {
        self.interpolate
    }

    pub fn seed_volume(&self) -> &ScalarVolume {
        &self.seed
    }

    #[inline]
    pub fn in_tracking(&self, pos: &Point3<f32>) -> bool {
        self.tracking.is_inside(pos, self.interpolate)
    }

    #[inline]
    pub fn in_stopping(&self, pos: &Point3<f32>) -> bool {
        self.stopping.is_inside(pos, self.interpolate)
    }

    /// Inside the tracking mask and outside every stopping region.
    #[inline]
    pub fn is_trackable(&self, pos: &Point3<f32>) -> bool {
        self.in_tracking(pos) && !self.in_stopping(pos)
    }

    #[inline]
    pub fn in_exclusion(&self, pos: &Point3<f32>) -> bool {
        self.exclusion_set && self.exclusion.is_inside(pos, self.interpolate)
    }

    #[inline]
    pub fn in_seed(&self, pos: &Point3<f32>) -> bool {
        self.seed.is_inside(pos, self.interpolate)
    }

    #[inline]
    pub fn in_target(&self, pos: &Point3<f32>) -> bool {
        self.target.is_inside(pos, self.interpolate)
    }

    /// Raw target label at `pos` (nearest voxel, never interpolated).
    #[inline]
    pub fn target_label(&self, pos: &Point3<f32>) -> f32 {
        self.target.sample(pos, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_masks_get_neutral_defaults() {
        let geom = GridGeometry::isotropic([4, 4, 4], 1.0);
        let inputs = MaskInputs::default();
        let masks = TrackingMasks::resolve(&inputs, &geom, true);
        let p = Point3::new(1.0, 1.0, 1.0);
        assert!(masks.is_trackable(&p));
        assert!(masks.in_seed(&p));
        assert!(masks.in_target(&p));
        assert!(!masks.in_exclusion(&p));
        assert!(!masks.target_set());
        assert!(!masks.is_trackable(&Point3::new(10.0, 1.0, 1.0)));
    }

    #[test]
    fn stopping_region_blocks_tracking() {
        let geom = GridGeometry::isotropic([4, 4, 4], 1.0);
        let inputs = MaskInputs {
            stopping: Some(ScalarVolume::from_fn(geom.clone(), |x, _, _| {
                if x >= 2 {
                    1.0
                } else {
                    0.0
                }
            })),
            ..Default::default()
        };
        let masks = TrackingMasks::resolve(&inputs, &geom, false);
        assert!(masks.is_trackable(&Point3::new(1.0, 1.0, 1.0)));
        assert!(!masks.is_trackable(&Point3::new(3.0, 1.0, 1.0)));
    }
}
