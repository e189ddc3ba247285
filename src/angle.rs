//! Angle utilities used by the tracking pipeline.

use nalgebra::Vector3;
use std::f32::consts::PI;

/// Largest step/voxel ratio used for the automatic angular threshold
/// (keeps the automatic estimate at or above 15°).
const AUTO_THRESHOLD_MAX_RATIO: f32 = 0.966;

/// Orientation difference of two unit vectors in degrees, treating
/// antipodal directions as equal. Returns a value in [0, 90].
#[inline]
pub fn axial_deviation_deg(a: &Vector3<f32>, b: &Vector3<f32>) -> f32 {
    a.dot(b).abs().min(1.0).acos().to_degrees()
}

/// Cosine of the maximum turning angle per step.
///
/// An explicit threshold in degrees wins; otherwise the threshold scales
/// with the step size relative to the smallest voxel edge, so that a full
/// voxel step allows at most roughly 90°.
pub fn angular_threshold_cos(explicit_deg: Option<f32>, step_size: f32, min_voxel: f32) -> f32 {
    match explicit_deg {
        Some(deg) => deg.to_radians().cos(),
        None => {
            let ratio = (step_size / min_voxel).min(AUTO_THRESHOLD_MAX_RATIO);
            (0.5 * PI * ratio).cos()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn axial_deviation_ignores_sign() {
        let x = Vector3::x();
        assert!(approx_eq(axial_deviation_deg(&x, &-x), 0.0));
        let d = Vector3::new(1.0, 1.0, 0.0).normalize();
        assert!(approx_eq(axial_deviation_deg(&x, &-d), 45.0));
    }

    #[test]
    fn automatic_threshold_follows_step_ratio() {
        let half = angular_threshold_cos(None, 0.5, 1.0);
        assert!(approx_eq(half, (0.25 * PI).cos()));
        let capped = angular_threshold_cos(None, 3.0, 1.0);
        assert!(approx_eq(capped, (0.5 * PI * 0.966).cos()));
        let explicit = angular_threshold_cos(Some(60.0), 0.5, 1.0);
        assert!(approx_eq(explicit, 0.5));
    }
}
