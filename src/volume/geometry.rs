//! Regular 3D grid geometry shared by every voxel field of a run.
//!
//! World coordinates relate to continuous voxel indices through
//! `world = origin + D · diag(spacing) · index`, where `D` holds the
//! direction cosines. Voxel centres sit at integer indices, so a voxel
//! covers `[i - 0.5, i + 0.5)` along each axis.
use nalgebra::{Matrix3, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Integer voxel index. Signed so that positions outside the grid still
/// map to a well-defined (out-of-range) index.
pub type VoxelIndex = [isize; 3];

/// Spacing, origin, orientation and extent of a voxel grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawGeometry")]
pub struct GridGeometry {
    /// Number of voxels along x, y, z.
    pub dims: [usize; 3],
    /// Voxel size along each index axis (millimetres).
    pub spacing: Vector3<f32>,
    /// World position of the centre of voxel (0, 0, 0).
    pub origin: Point3<f32>,
    /// Direction cosines, one column per index axis.
    pub direction: Matrix3<f32>,
    #[serde(skip)]
    index_to_world: Matrix3<f32>,
    #[serde(skip)]
    world_to_index: Matrix3<f32>,
}

#[derive(Deserialize)]
struct RawGeometry {
    dims: [usize; 3],
    spacing: Vector3<f32>,
    origin: Point3<f32>,
    #[serde(default = "Matrix3::identity")]
    direction: Matrix3<f32>,
}

impl From<RawGeometry> for GridGeometry {
    fn from(raw: RawGeometry) -> Self {
        Self::with_direction(raw.dims, raw.spacing, raw.origin, raw.direction)
    }
}

impl GridGeometry {
    /// Axis-aligned grid with the given extent and spacing.
    pub fn new(dims: [usize; 3], spacing: Vector3<f32>, origin: Point3<f32>) -> Self {
        Self::with_direction(dims, spacing, origin, Matrix3::identity())
    }

    /// Grid with an explicit direction-cosine matrix.
    pub fn with_direction(
        dims: [usize; 3],
        spacing: Vector3<f32>,
        origin: Point3<f32>,
        direction: Matrix3<f32>,
    ) -> Self {
        let mut geometry = Self {
            dims,
            spacing,
            origin,
            direction,
            index_to_world: Matrix3::identity(),
            world_to_index: Matrix3::identity(),
        };
        geometry.refresh_transforms();
        geometry
    }

    /// Unit-spaced, axis-aligned grid anchored at the world origin.
    pub fn isotropic(dims: [usize; 3], spacing: f32) -> Self {
        Self::new(dims, Vector3::repeat(spacing), Point3::origin())
    }

    fn refresh_transforms(&mut self) {
        self.index_to_world = self.direction * Matrix3::from_diagonal(&self.spacing);
        self.world_to_index = self
            .index_to_world
            .try_inverse()
            .unwrap_or_else(Matrix3::identity);
    }

    #[inline]
    pub fn voxel_count(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// Smallest voxel edge length.
    pub fn min_spacing(&self) -> f32 {
        self.spacing.x.min(self.spacing.y).min(self.spacing.z)
    }

    #[inline]
    pub fn world_to_continuous_index(&self, world: &Point3<f32>) -> Vector3<f32> {
        self.world_to_index * (world - self.origin)
    }

    /// Nearest voxel index (rounded continuous index).
    #[inline]
    pub fn world_to_index(&self, world: &Point3<f32>) -> VoxelIndex {
        let c = self.world_to_continuous_index(world);
        [
            c.x.round() as isize,
            c.y.round() as isize,
            c.z.round() as isize,
        ]
    }

    #[inline]
    pub fn continuous_index_to_world(&self, index: &Vector3<f32>) -> Point3<f32> {
        self.origin + self.index_to_world * index
    }

    /// World position of a voxel centre.
    #[inline]
    pub fn index_to_world(&self, index: VoxelIndex) -> Point3<f32> {
        self.continuous_index_to_world(&Vector3::new(
            index[0] as f32,
            index[1] as f32,
            index[2] as f32,
        ))
    }

    /// True when the continuous index falls within the voxel buffer.
    #[inline]
    pub fn contains_continuous(&self, index: &Vector3<f32>) -> bool {
        (0..3).all(|axis| index[axis] >= -0.5 && index[axis] < self.dims[axis] as f32 - 0.5)
    }

    #[inline]
    pub fn contains_world(&self, world: &Point3<f32>) -> bool {
        self.contains_continuous(&self.world_to_continuous_index(world))
    }

    #[inline]
    pub fn contains_index(&self, index: VoxelIndex) -> bool {
        (0..3).all(|axis| index[axis] >= 0 && (index[axis] as usize) < self.dims[axis])
    }

    /// Linear offset of an in-range voxel (x fastest).
    #[inline]
    pub fn linear_index(&self, x: usize, y: usize, z: usize) -> usize {
        x + y * self.dims[0] + z * self.dims[0] * self.dims[1]
    }

    /// Linear offset of a signed index, `None` when outside the grid.
    #[inline]
    pub fn checked_linear_index(&self, index: VoxelIndex) -> Option<usize> {
        self.contains_index(index).then(|| {
            self.linear_index(index[0] as usize, index[1] as usize, index[2] as usize)
        })
    }

    /// Iterate over all voxel indices in storage order.
    pub fn indices(&self) -> impl Iterator<Item = VoxelIndex> + '_ {
        let [nx, ny, nz] = self.dims;
        (0..nz).flat_map(move |z| {
            (0..ny).flat_map(move |y| (0..nx).map(move |x| [x as isize, y as isize, z as isize]))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_world_roundtrip_with_rotation() {
        let rot = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        let geom = GridGeometry::with_direction(
            [4, 5, 6],
            Vector3::new(2.0, 1.0, 0.5),
            Point3::new(10.0, -3.0, 1.0),
            rot,
        );
        let world = geom.index_to_world([1, 2, 3]);
        assert_eq!(geom.world_to_index(&world), [1, 2, 3]);
        let expected = Point3::new(10.0 - 2.0, -3.0 + 2.0, 1.0 + 1.5);
        assert!((world - expected).norm() < 1e-5, "world={world:?}");
    }

    #[test]
    fn containment_uses_half_voxel_border() {
        let geom = GridGeometry::isotropic([3, 3, 3], 1.0);
        assert!(geom.contains_world(&Point3::new(-0.49, 0.0, 2.49)));
        assert!(!geom.contains_world(&Point3::new(-0.51, 0.0, 0.0)));
        assert!(!geom.contains_world(&Point3::new(0.0, 2.5, 0.0)));
    }

    #[test]
    fn indices_follow_storage_order() {
        let geom = GridGeometry::isotropic([2, 2, 2], 1.0);
        let all: Vec<_> = geom.indices().collect();
        assert_eq!(all.len(), 8);
        for (linear, idx) in all.iter().enumerate() {
            assert_eq!(geom.checked_linear_index(*idx), Some(linear));
        }
    }
}
