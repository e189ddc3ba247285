use fiber_tracker::volume::{GridGeometry, ScalarVolume, VectorVolume, VoxelField};
use nalgebra::Vector3;

/// Peak field plus the masks describing one synthetic bundle.
pub struct Phantom {
    pub peaks: VectorVolume,
    pub tracking: ScalarVolume,
    pub seed: ScalarVolume,
}

impl Phantom {
    pub fn geometry(&self) -> &GridGeometry {
        self.peaks.geometry()
    }
}

/// Binary mask from a voxel predicate.
pub fn region(geometry: &GridGeometry, inside: impl Fn(usize, usize, usize) -> bool) -> ScalarVolume {
    ScalarVolume::from_fn(geometry.clone(), |x, y, z| if inside(x, y, z) { 1.0 } else { 0.0 })
}

/// Straight tube along x spanning `x_range` (inclusive), centred in y and z.
/// Seeds fill the tube cross-section halfway along it.
pub fn straight_bundle(dims: [usize; 3], x_range: (usize, usize), tube_radius: f32) -> Phantom {
    let geometry = GridGeometry::isotropic(dims, 1.0);
    let cy = (dims[1] - 1) as f32 / 2.0;
    let cz = (dims[2] - 1) as f32 / 2.0;
    let in_tube = move |x: usize, y: usize, z: usize| {
        let dy = y as f32 - cy;
        let dz = z as f32 - cz;
        x >= x_range.0 && x <= x_range.1 && (dy * dy + dz * dz).sqrt() <= tube_radius
    };
    let seed_x = (x_range.0 + x_range.1) / 2;
    Phantom {
        peaks: VectorVolume::from_fn(geometry.clone(), |_, _, _| Vector3::x()),
        tracking: region(&geometry, in_tube),
        seed: region(&geometry, move |x, y, z| x == seed_x && in_tube(x, y, z)),
    }
}

/// Quarter-circle bundle in the xy plane around the grid corner, with
/// seeds on the diagonal.
pub fn curved_bundle(dims: [usize; 3], arc_radius: f32, tube_radius: f32) -> Phantom {
    let geometry = GridGeometry::isotropic(dims, 1.0);
    let cz = (dims[2] - 1) as f32 / 2.0;
    let in_tube = move |x: usize, y: usize, z: usize| {
        let r = ((x * x + y * y) as f32).sqrt();
        (r - arc_radius).abs() <= tube_radius && (z as f32 - cz).abs() <= tube_radius
    };
    let peaks = VectorVolume::from_fn(geometry.clone(), |x, y, _| {
        Vector3::new(-(y as f32), x as f32, 0.0)
            .try_normalize(1e-6)
            .unwrap_or_else(Vector3::zeros)
    });
    Phantom {
        peaks,
        tracking: region(&geometry, in_tube),
        seed: region(&geometry, move |x, y, z| x.abs_diff(y) <= 1 && in_tube(x, y, z)),
    }
}
