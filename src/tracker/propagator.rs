//! One-directional streamline growth.
use super::estimator::DirectionEstimator;
use super::masks::TrackingMasks;
use super::params::StepGeometry;
use super::run_state::RunState;
use crate::angle::axial_deviation_deg;
use crate::proposer::DirectionHistory;
use crate::types::{FiberEnd, Streamline};
use crate::volume::GridGeometry;
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use serde::Serialize;
use std::collections::VecDeque;

/// Direction magnitude below which a streamline has lost its way.
const MIN_DIRECTION_NORM: f32 = 1e-4;
/// Fewer recorded directions than this never fail the curvature check.
const MIN_CURVATURE_SAMPLES: usize = 8;

/// Why a propagation pass stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Termination {
    /// Entered an exclusion region; the whole streamline is discarded.
    Excluded,
    /// The run was aborted.
    Aborted,
    /// Exceeded the maximum tract length.
    MaxLength,
    /// Mean deviation over the recent arc exceeded the loop check angle.
    Curvature,
    /// No usable direction at the new position.
    LostDirection,
    /// Per-pass step budget exhausted.
    StepBudget,
}

/// Outcome of one pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Propagation {
    /// Accumulated streamline length including earlier passes.
    pub length: f32,
    pub termination: Termination,
}

impl Propagation {
    pub fn excluded(&self) -> bool {
        self.termination == Termination::Excluded
    }
}

pub struct StreamlinePropagator<'r> {
    estimator: &'r DirectionEstimator<'r>,
    masks: &'r TrackingMasks<'r>,
    geometry: &'r GridGeometry,
    state: &'r RunState,
    step: StepGeometry,
    max_tract_length: f32,
    step_budget: usize,
    loop_check_deg: Option<f32>,
    num_previous_directions: usize,
}

impl<'r> StreamlinePropagator<'r> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        estimator: &'r DirectionEstimator<'r>,
        masks: &'r TrackingMasks<'r>,
        geometry: &'r GridGeometry,
        state: &'r RunState,
        step: StepGeometry,
        max_tract_length: f32,
        max_steps: usize,
        loop_check_deg: Option<f32>,
        num_previous_directions: usize,
    ) -> Self {
        Self {
            estimator,
            masks,
            geometry,
            state,
            step,
            max_tract_length,
            step_budget: max_steps / 2,
            loop_check_deg,
            num_previous_directions: num_previous_directions.max(1),
        }
    }

    /// Grow `fiber` at `end`, starting at `seed` with direction `dir`.
    ///
    /// The first step has length `|dir| * step_size`; later steps use unit
    /// directions. Points are appended after each step, the seed itself is
    /// not.
    pub fn follow(
        &self,
        seed: Point3<f32>,
        mut dir: Vector3<f32>,
        fiber: &mut Streamline,
        start_length: f32,
        end: FiberEnd,
        rng: &mut StdRng,
    ) -> Propagation {
        let mut pos = seed;
        let mut length = start_length;
        let mut history: DirectionHistory = std::iter::repeat(Vector3::zeros())
            .take(self.num_previous_directions - 1)
            .collect();
        let done = |length, termination| Propagation {
            length,
            termination,
        };

        for _ in 0..self.step_budget {
            let origin = self.geometry.world_to_index(&pos);
            pos += dir * self.step.step_size;

            if self.masks.in_exclusion(&pos) {
                return done(length, Termination::Excluded);
            }
            if self.state.aborted() {
                return done(length, Termination::Aborted);
            }

            dir = dir.try_normalize(f32::EPSILON).unwrap_or(dir);
            fiber.push_step(end, pos, dir);
            length += self.step.step_size;

            if let Some(limit) = self.loop_check_deg {
                let deviation = curvature_deviation(
                    &fiber.directions,
                    end,
                    self.step.curvature_span,
                    self.step.step_size,
                );
                if deviation > limit {
                    return done(length, Termination::Curvature);
                }
            }
            if length > self.max_tract_length {
                return done(length, Termination::MaxLength);
            }

            history.push_back(dir);
            if history.len() > self.num_previous_directions {
                history.pop_front();
            }
            dir = self.estimator.propose_step(&pos, &history, origin, rng);

            self.state.wait_while_paused();

            if dir.norm() < MIN_DIRECTION_NORM {
                return done(length, Termination::LostDirection);
            }
        }
        done(length, Termination::StepBudget)
    }
}

/// Mean angular deviation, in degrees, of the directions covering the last
/// `span` millimetres at `end` from their sign-aligned mean.
pub fn curvature_deviation(
    directions: &VecDeque<Vector3<f32>>,
    end: FiberEnd,
    span: f32,
    step_size: f32,
) -> f32 {
    if directions.len() < MIN_CURVATURE_SAMPLES {
        return 0.0;
    }
    // The front walk stops one short of the oldest direction.
    let ordered: Box<dyn Iterator<Item = &Vector3<f32>> + '_> = match end {
        FiberEnd::Front => Box::new(directions.iter().take(directions.len() - 1)),
        FiberEnd::Back => Box::new(directions.iter().rev()),
    };
    let mut samples = Vec::new();
    let mut mean = Vector3::zeros();
    let mut dist = 0.0f32;
    for v in ordered {
        if dist >= span {
            break;
        }
        dist += step_size;
        let v = if v.dot(&mean) < 0.0 { -v } else { *v };
        samples.push(v);
        mean += v;
    }
    let Some(mean) = mean.try_normalize(f32::EPSILON) else {
        return 0.0;
    };
    if samples.is_empty() {
        return 0.0;
    }
    let total: f32 = samples
        .iter()
        .map(|v| axial_deviation_deg(&mean, v))
        .sum();
    total / samples.len() as f32
}
