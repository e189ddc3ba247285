//! Fixed point shell used for neighbourhood probing and stop voting.

use nalgebra::Vector3;
use std::f32::consts::PI;

/// `n` unit vectors spread quasi-uniformly over the sphere.
///
/// Points are placed on a spiral running from pole to pole: heights are
/// equally spaced in `z` (equal-area latitude bands) and the azimuth
/// advances by an amount inversely proportional to the band radius.
/// Returns an empty set for `n < 2`. The construction is deterministic.
pub fn create_directions(n: usize) -> Vec<Vector3<f32>> {
    if n < 2 {
        return Vec::new();
    }
    let c = (4.0 * PI).sqrt();
    let last = (n - 1) as f32;
    let mut phi = 0.0f32;
    let mut shell = Vec::with_capacity(n);
    for i in 0..n {
        let z = -1.0 + 2.0 * i as f32 / last;
        let theta = z.clamp(-1.0, 1.0).acos() - 0.5 * PI;
        if i == 0 || i == n - 1 {
            phi = 0.0;
        } else {
            phi += c / (n as f32 * (1.0 - z * z)).sqrt();
        }
        shell.push(Vector3::new(
            theta.cos() * phi.cos(),
            theta.cos() * phi.sin(),
            theta.sin(),
        ));
    }
    shell
}
