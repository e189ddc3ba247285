//! Per-step direction estimation.
//!
//! The proposer's direction at the current position is averaged with the
//! directions found at a set of probe positions around it. Probes aligned
//! with the previous step act as stop voters: when at least half of them
//! fall outside trackable tissue the streamline ends. Probes that leave the
//! tracking mask may be deflected back towards tissue, which pulls the
//! streamline away from the mask border.
use super::masks::TrackingMasks;
use super::neighborhood::create_directions;
use super::params::{PriorParams, SamplingParams};
use crate::proposer::{DirectionHistory, DirectionProposer};
use crate::volume::VoxelIndex;
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;

/// Probes whose direction has a larger dot product with the previous step
/// are stop voters.
const STOP_VOTE_DOT: f32 = 0.7;
/// Minimum magnitude of a usable probe direction.
const PROBE_EPS: f32 = 1e-6;
/// Minimum magnitude of the accumulated direction.
const MIN_RESULT_NORM: f32 = 0.001;
/// Fraction of stop votes that terminates the streamline.
const STOP_VOTE_FRACTION: f32 = 0.5;

pub struct DirectionEstimator<'r> {
    proposer: &'r dyn DirectionProposer,
    prior: Option<&'r dyn DirectionProposer>,
    masks: &'r TrackingMasks<'r>,
    shell: Vec<Vector3<f32>>,
    sampling: SamplingParams,
    prior_params: PriorParams,
    sampling_distance: f32,
    random_offsets: bool,
}

impl<'r> DirectionEstimator<'r> {
    pub fn new(
        proposer: &'r dyn DirectionProposer,
        prior: Option<&'r dyn DirectionProposer>,
        masks: &'r TrackingMasks<'r>,
        sampling: &SamplingParams,
        prior_params: &PriorParams,
        sampling_distance: f32,
        random: bool,
    ) -> Self {
        Self {
            proposer,
            prior,
            masks,
            shell: create_directions(sampling.number_of_samples),
            sampling: sampling.clone(),
            prior_params: prior_params.clone(),
            sampling_distance,
            random_offsets: random && sampling.random_sampling,
        }
    }

    fn probe(
        &self,
        pos: &Point3<f32>,
        history: &DirectionHistory,
        origin: VoxelIndex,
        rng: &mut StdRng,
    ) -> Vector3<f32> {
        if self.masks.in_tracking(pos) {
            self.proposer.propose_direction(pos, history, origin, rng)
        } else {
            Vector3::zeros()
        }
    }

    fn random_offset(&self, rng: &mut StdRng) -> Vector3<f32> {
        let p = self.proposer;
        let d = Vector3::new(
            p.random_double(rng, -0.5, 0.5) as f32,
            p.random_double(rng, -0.5, 0.5) as f32,
            p.random_double(rng, -0.5, 0.5) as f32,
        );
        let d = d.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros);
        d * p.random_double(rng, 0.0, self.sampling_distance as f64) as f32
    }

    /// Unit direction for the next step from `pos`, or zero to terminate.
    ///
    /// `history` holds the recent step directions (oldest first); an empty
    /// history skips neighbourhood probing. `origin` is the voxel the
    /// current step started from.
    pub fn propose_step(
        &self,
        pos: &Point3<f32>,
        history: &DirectionHistory,
        origin: VoxelIndex,
        rng: &mut StdRng,
    ) -> Vector3<f32> {
        if !self.masks.is_trackable(pos) {
            return Vector3::zeros();
        }
        let mut direction = self.proposer.propose_direction(pos, history, origin, rng);

        let mut stop_votes = 0usize;
        let mut possible_stop_votes = 0usize;
        if let Some(&last) = history.back() {
            // Random offsets replace the shell directions one for one, so a
            // shell of fewer than two samples disables probing in both modes.
            for d in &self.shell {
                let mut is_stop_voter = false;
                let offset = if self.random_offsets {
                    self.random_offset(rng)
                } else {
                    let dot = d.dot(&last);
                    if self.sampling.use_stop_votes && dot > STOP_VOTE_DOT {
                        is_stop_voter = true;
                        possible_stop_votes += 1;
                    } else if self.sampling.only_forward_samples && dot < 0.0 {
                        continue;
                    }
                    d * self.sampling_distance
                };

                let found = self.probe(&(pos + offset), history, origin, rng);
                if found.norm() > PROBE_EPS {
                    direction += found;
                    continue;
                }

                if is_stop_voter {
                    stop_votes += 1;
                }
                if !(self.sampling.avoid_stop && last.norm() > 0.5) {
                    continue;
                }

                // Probe left tissue: look into the mirrored direction instead.
                let dot = offset.dot(&last);
                let deflected = if dot >= 0.0 {
                    -offset + last * (2.0 * dot)
                } else {
                    -offset
                };
                let recovered = self.probe(&(pos + deflected), history, origin, rng);
                if recovered.norm() > PROBE_EPS {
                    direction += deflected * self.sampling.deflection_mod;
                    direction += recovered;
                }
            }
        }

        let votes_ok = possible_stop_votes == 0
            || (stop_votes as f32 / possible_stop_votes as f32) < STOP_VOTE_FRACTION;
        let valid = direction.norm() > MIN_RESULT_NORM && votes_ok;
        direction = if valid {
            direction.normalize()
        } else {
            Vector3::zeros()
        };

        if let Some(prior) = self.prior {
            if self.prior_params.introduce_directions || valid {
                direction = self.blend_prior(prior, direction, pos, history, origin, rng);
            }
        }
        direction
    }

    fn blend_prior(
        &self,
        prior: &dyn DirectionProposer,
        direction: Vector3<f32>,
        pos: &Point3<f32>,
        history: &DirectionHistory,
        origin: VoxelIndex,
        rng: &mut StdRng,
    ) -> Vector3<f32> {
        let prior_dir = prior.propose_direction(pos, history, origin, rng);
        if prior_dir.norm() > MIN_RESULT_NORM {
            let mut prior_dir = prior_dir.normalize();
            if prior_dir.dot(&direction) < 0.0 {
                prior_dir = -prior_dir;
            }
            let w = self.prior_params.weight;
            let blended = direction * (1.0 - w) + prior_dir * w;
            blended.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros)
        } else if self.prior_params.as_mask {
            Vector3::zeros()
        } else {
            direction
        }
    }
}
