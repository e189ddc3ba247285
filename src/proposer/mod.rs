//! Direction proposal capability consumed by the tracking core.
//!
//! A proposer turns a world position plus a short history of previous step
//! directions into a unit direction, or the zero vector when no confident
//! direction exists. The tracking core only ever talks to the
//! [`DirectionProposer`] trait; each model family (tensor, ODF, peaks,
//! random forest) is one implementation. The crate ships [`PeakProposer`],
//! which follows a precomputed peak-direction field.

mod peaks;

pub use peaks::PeakProposer;

use crate::volume::{GridGeometry, VoxelIndex};
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Bounded history of recent step directions, oldest first.
pub type DirectionHistory = VecDeque<Vector3<f32>>;

/// Sampling regime of a proposer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    Deterministic,
    Probabilistic,
}

/// Declared identity of the model behind a proposer. Used for provenance
/// tagging only; the tracking core never branches on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "family")]
pub enum ModelFamily {
    /// Diffusion tensor model with `tensor_count` compartments.
    Tensor { tensor_count: usize },
    /// Orientation distribution function, possibly derived from a tensor.
    Odf { from_tensor: bool },
    /// Precomputed peak directions.
    Peaks,
    /// Machine-learned, model-free direction classifier.
    RandomForest,
}

pub trait DirectionProposer: Send + Sync {
    /// Grid the proposer's data lives on. Default masks, seeds and density
    /// maps are laid out on this geometry.
    fn geometry(&self) -> &GridGeometry;

    fn mode(&self) -> TrackingMode;

    fn model(&self) -> ModelFamily;

    /// Whether the underlying field is interpolated between voxels.
    fn interpolates(&self) -> bool {
        true
    }

    /// Called once before tracking starts.
    fn init_for_tracking(&mut self) {}

    /// Maximum allowed turning angle per step, as a cosine.
    fn set_angular_threshold(&mut self, cos_threshold: f32);

    /// Proposed unit direction at `pos`, or zero when none is confident.
    /// `origin` is the voxel the current step started from.
    fn propose_direction(
        &self,
        pos: &Point3<f32>,
        history: &DirectionHistory,
        origin: VoxelIndex,
        rng: &mut StdRng,
    ) -> Vector3<f32>;

    /// Uniform sample in `[min, max)`; returns `min` for an empty range.
    fn random_double(&self, rng: &mut StdRng, min: f64, max: f64) -> f64 {
        min + (max - min) * rng.gen::<f64>()
    }
}
