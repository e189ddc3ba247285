//! Parameter types configuring a tracking run.
//!
//! Lengths ending in `_vox` are expressed in units of the smallest voxel
//! edge of the direction field; all other lengths are millimetres.
//! Defaults reproduce the usual streamline tracking setup: half-voxel
//! steps, 20–400 mm fibres, 30 neighbourhood probes and 10 trials per
//! seed in probabilistic mode.

use super::validator::EndpointConstraint;
use crate::angle::angular_threshold_cos;
use crate::error::{Result, TrackingError};
use serde::{Deserialize, Serialize};

/// Run-wide tracking parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerParams {
    /// Step size in voxels. `None` uses half the smallest voxel edge.
    pub step_size_vox: Option<f32>,
    /// Maximum turning angle per step. `None` derives it from the step size.
    pub angular_threshold_deg: Option<f32>,
    /// Shorter fibres are discarded.
    pub min_tract_length: f32,
    /// Propagation stops once a fibre exceeds this length.
    pub max_tract_length: f32,
    /// Step budget per fibre, shared by the forward and backward pass.
    pub max_steps: usize,
    /// Seeds placed in every seed-mask voxel (one centred, the rest jittered).
    pub seeds_per_voxel: usize,
    /// Stop once this many fibres were accepted.
    pub max_num_tracts: Option<usize>,
    /// Mean angular deviation (degrees) over the recent span that ends a
    /// fibre. `None` disables the check.
    pub loop_check_deg: Option<f32>,
    /// Attempts per seed in probabilistic mode.
    pub trials_per_seed: usize,
    /// Endpoint policy. `None` is refined from the supplied masks.
    pub endpoint_constraint: EndpointConstraint,
    /// Trilinear mask sampling instead of nearest voxel.
    pub interpolate_masks: bool,
    /// Shuffle seeds and allow random neighbourhood sampling.
    pub random: bool,
    /// Base seed for all random draws. `None` picks one per run.
    pub rng_seed: Option<u64>,
    /// Worker threads. `None` uses the available parallelism.
    pub num_threads: Option<usize>,
    /// Single-threaded run intended for step-by-step inspection.
    pub demo_mode: bool,
    /// Accumulate a visitation density volume instead of fibre geometry.
    pub output_density_map: bool,
    pub sampling: SamplingParams,
    pub prior: PriorParams,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            step_size_vox: None,
            angular_threshold_deg: None,
            min_tract_length: 20.0,
            max_tract_length: 400.0,
            max_steps: 10_000,
            seeds_per_voxel: 1,
            max_num_tracts: None,
            loop_check_deg: None,
            trials_per_seed: 10,
            endpoint_constraint: EndpointConstraint::None,
            interpolate_masks: true,
            random: true,
            rng_seed: None,
            num_threads: None,
            demo_mode: false,
            output_density_map: false,
            sampling: SamplingParams::default(),
            prior: PriorParams::default(),
        }
    }
}

/// Neighbourhood probing used by the direction estimator.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    /// Probe radius in voxels. `None` uses a quarter of the smallest edge.
    pub sampling_distance_vox: Option<f32>,
    /// Probes per step.
    pub number_of_samples: usize,
    /// Random probe offsets instead of the fixed point shell (needs `random`).
    pub random_sampling: bool,
    /// Try a deflected probe when a probe leaves the tracking mask.
    pub avoid_stop: bool,
    /// Weight of the deflection offset in the accumulated direction.
    pub deflection_mod: f32,
    /// Skip shell probes pointing backwards.
    pub only_forward_samples: bool,
    /// Let probes aligned with the previous step vote for termination.
    pub use_stop_votes: bool,
    /// Length of the direction history handed to the proposer.
    pub num_previous_directions: usize,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            sampling_distance_vox: None,
            number_of_samples: 30,
            random_sampling: false,
            avoid_stop: true,
            deflection_mod: 1.0,
            only_forward_samples: true,
            use_stop_votes: true,
            num_previous_directions: 1,
        }
    }
}

/// Blending of an optional directional prior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorParams {
    /// Weight of the prior direction in `[0, 1]`.
    pub weight: f32,
    /// Let the prior propose directions where the data found none.
    pub introduce_directions: bool,
    /// Stop where the prior has no direction.
    pub as_mask: bool,
}

impl Default for PriorParams {
    fn default() -> Self {
        Self {
            weight: 1.0,
            introduce_directions: true,
            as_mask: true,
        }
    }
}

impl TrackerParams {
    /// Reject values the tracker cannot work with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |name: &'static str, reason: &str| {
            Err(TrackingError::InvalidParameter {
                name,
                reason: reason.to_string(),
            })
        };
        if self.sampling.num_previous_directions == 0 {
            return invalid("sampling.num_previous_directions", "must be at least 1");
        }
        if self.trials_per_seed == 0 {
            return invalid("trials_per_seed", "must be at least 1");
        }
        if self.seeds_per_voxel == 0 {
            return invalid("seeds_per_voxel", "must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.prior.weight) {
            return invalid("prior.weight", "must lie in [0, 1]");
        }
        if self.max_tract_length <= 0.0 {
            return invalid("max_tract_length", "must be positive");
        }
        if matches!(self.num_threads, Some(0)) {
            return invalid("num_threads", "must be at least 1");
        }
        Ok(())
    }

    /// Worker count after applying demo mode.
    pub fn worker_count(&self) -> usize {
        if self.demo_mode {
            return 1;
        }
        self.num_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Step-level quantities derived from the parameters and voxel size.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepGeometry {
    pub min_voxel_size: f32,
    /// Millimetres advanced per step.
    pub step_size: f32,
    /// Cosine of the maximum turning angle.
    pub angular_threshold_cos: f32,
    /// Probe radius in millimetres.
    pub sampling_distance: f32,
    /// Arc length inspected by the curvature check.
    pub curvature_span: f32,
}

impl StepGeometry {
    pub fn resolve(params: &TrackerParams, min_voxel_size: f32) -> Self {
        let step_size = match params.step_size_vox {
            Some(vox) if vox > f32::EPSILON => vox * min_voxel_size,
            _ => 0.5 * min_voxel_size,
        };
        let sampling_distance = match params.sampling.sampling_distance_vox {
            Some(vox) if vox > f32::EPSILON => vox * min_voxel_size,
            _ => 0.25 * min_voxel_size,
        };
        let angular_threshold_cos =
            angular_threshold_cos(params.angular_threshold_deg, step_size, min_voxel_size);
        Self {
            min_voxel_size,
            step_size,
            angular_threshold_cos,
            sampling_distance,
            curvature_span: (4.0 * min_voxel_size).max(8.0 * step_size),
        }
    }
}
