use super::{DirectionHistory, DirectionProposer, ModelFamily, TrackingMode};
use crate::volume::{GridGeometry, VectorVolume, VoxelField, VoxelIndex};
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;

const MIN_PEAK_NORM: f32 = 1e-4;

/// Follows a field of precomputed fibre peaks.
///
/// Deterministic mode returns the (interpolated) peak aligned with the
/// previous step. Probabilistic mode perturbs the peak by a random offset
/// of length `jitter` before applying the angular threshold.
#[derive(Clone, Debug)]
pub struct PeakProposer {
    peaks: VectorVolume,
    mode: TrackingMode,
    interpolate: bool,
    jitter: f32,
    cos_threshold: f32,
}

impl PeakProposer {
    pub fn new(peaks: VectorVolume, mode: TrackingMode) -> Self {
        Self {
            peaks,
            mode,
            interpolate: true,
            jitter: 0.2,
            cos_threshold: 0.0,
        }
    }

    pub fn with_interpolation(mut self, interpolate: bool) -> Self {
        self.interpolate = interpolate;
        self
    }

    /// Perturbation length used in probabilistic mode.
    pub fn with_jitter(mut self, jitter: f32) -> Self {
        self.jitter = jitter.max(0.0);
        self
    }

    pub fn cos_threshold(&self) -> f32 {
        self.cos_threshold
    }

    fn random_unit(&self, rng: &mut StdRng) -> Vector3<f32> {
        let v = Vector3::new(
            self.random_double(rng, -0.5, 0.5) as f32,
            self.random_double(rng, -0.5, 0.5) as f32,
            self.random_double(rng, -0.5, 0.5) as f32,
        );
        v.try_normalize(1e-6).unwrap_or_else(Vector3::x)
    }
}

impl DirectionProposer for PeakProposer {
    fn geometry(&self) -> &GridGeometry {
        self.peaks.geometry()
    }

    fn mode(&self) -> TrackingMode {
        self.mode
    }

    fn model(&self) -> ModelFamily {
        ModelFamily::Peaks
    }

    fn interpolates(&self) -> bool {
        self.interpolate
    }

    fn set_angular_threshold(&mut self, cos_threshold: f32) {
        self.cos_threshold = cos_threshold;
    }

    fn propose_direction(
        &self,
        pos: &Point3<f32>,
        history: &DirectionHistory,
        _origin: VoxelIndex,
        rng: &mut StdRng,
    ) -> Vector3<f32> {
        let last = history.back().copied().unwrap_or_else(Vector3::zeros);
        let peak = self.peaks.sample_aligned(pos, &last, self.interpolate);
        let Some(mut dir) = peak.try_normalize(MIN_PEAK_NORM) else {
            return Vector3::zeros();
        };

        if self.mode == TrackingMode::Probabilistic && self.jitter > 0.0 {
            let perturbed = dir + self.random_unit(rng) * self.jitter;
            dir = perturbed.try_normalize(1e-6).unwrap_or(dir);
        }

        if last.norm() > 0.5 {
            if dir.dot(&last) < 0.0 {
                dir = -dir;
            }
            if dir.dot(&last) < self.cos_threshold {
                return Vector3::zeros();
            }
        }
        dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn uniform_x(mode: TrackingMode) -> PeakProposer {
        let field = VectorVolume::from_fn(GridGeometry::isotropic([5, 5, 5], 1.0), |_, _, _| {
            Vector3::x()
        });
        PeakProposer::new(field, mode)
    }

    #[test]
    fn follows_previous_direction_sign() {
        let mut proposer = uniform_x(TrackingMode::Deterministic);
        proposer.set_angular_threshold(0.5);
        let mut rng = StdRng::seed_from_u64(0);
        let history: DirectionHistory = [-Vector3::x()].into_iter().collect();
        let d = proposer.propose_direction(&Point3::new(2.0, 2.0, 2.0), &history, [2, 2, 2], &mut rng);
        assert!((d + Vector3::x()).norm() < 1e-5, "d={d:?}");
    }

    #[test]
    fn sharp_turn_is_rejected() {
        let mut proposer = uniform_x(TrackingMode::Deterministic);
        proposer.set_angular_threshold(0.7);
        let mut rng = StdRng::seed_from_u64(0);
        let history: DirectionHistory = [Vector3::y()].into_iter().collect();
        let d = proposer.propose_direction(&Point3::new(2.0, 2.0, 2.0), &history, [2, 2, 2], &mut rng);
        assert_eq!(d, Vector3::zeros());
    }

    #[test]
    fn probabilistic_mode_stays_unit_and_near_peak() {
        let proposer = uniform_x(TrackingMode::Probabilistic).with_jitter(0.2);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..32 {
            let d = proposer.propose_direction(
                &Point3::new(2.0, 2.0, 2.0),
                &DirectionHistory::new(),
                [2, 2, 2],
                &mut rng,
            );
            assert!((d.norm() - 1.0).abs() < 1e-5);
            assert!(d.x.abs() > 0.9, "d={d:?}");
        }
    }
}
