use super::geometry::{GridGeometry, VoxelIndex};
use nalgebra::Point3;

/// Read access to a field stored on a [`GridGeometry`].
///
/// Implementors only provide raw voxel access; nearest-voxel lookup and the
/// trilinear corner stencil are shared.
pub trait VoxelField {
    type Voxel: Copy;

    fn geometry(&self) -> &GridGeometry;

    /// Value of an in-range voxel.
    fn voxel(&self, x: usize, y: usize, z: usize) -> Self::Voxel;

    fn voxel_at(&self, index: VoxelIndex) -> Option<Self::Voxel> {
        self.geometry()
            .contains_index(index)
            .then(|| self.voxel(index[0] as usize, index[1] as usize, index[2] as usize))
    }

    /// Value of the voxel containing `world`, `None` outside the grid.
    fn nearest(&self, world: &Point3<f32>) -> Option<Self::Voxel> {
        let geom = self.geometry();
        let c = geom.world_to_continuous_index(world);
        if !geom.contains_continuous(&c) {
            return None;
        }
        let clamp = |v: f32, dim: usize| (v.round().max(0.0) as usize).min(dim - 1);
        Some(self.voxel(
            clamp(c.x, geom.dims[0]),
            clamp(c.y, geom.dims[1]),
            clamp(c.z, geom.dims[2]),
        ))
    }

    /// Eight-voxel trilinear stencil around `world`, `None` outside the grid.
    /// Neighbours past the border are clamped to the edge voxel.
    fn corners(&self, world: &Point3<f32>) -> Option<Corners<Self::Voxel>> {
        let geom = self.geometry();
        let c = geom.world_to_continuous_index(world);
        if !geom.contains_continuous(&c) {
            return None;
        }
        let base = [c.x.floor(), c.y.floor(), c.z.floor()];
        let t = [c.x - base[0], c.y - base[1], c.z - base[2]];
        let clamp = |v: isize, dim: usize| v.clamp(0, dim as isize - 1) as usize;

        let mut values = [self.voxel(0, 0, 0); 8];
        let mut weights = [0.0f32; 8];
        for corner in 0..8 {
            let offset = [corner & 1, (corner >> 1) & 1, (corner >> 2) & 1];
            let mut w = 1.0;
            let mut idx = [0usize; 3];
            for axis in 0..3 {
                let i = base[axis] as isize + offset[axis] as isize;
                idx[axis] = clamp(i, geom.dims[axis]);
                w *= if offset[axis] == 1 { t[axis] } else { 1.0 - t[axis] };
            }
            values[corner] = self.voxel(idx[0], idx[1], idx[2]);
            weights[corner] = w;
        }
        Some(Corners { values, weights })
    }
}

/// Corner values and trilinear weights (weights sum to one).
#[derive(Clone, Copy, Debug)]
pub struct Corners<T> {
    pub values: [T; 8],
    pub weights: [f32; 8],
}

impl<T: Copy> Corners<T> {
    pub fn iter(&self) -> impl Iterator<Item = (T, f32)> + '_ {
        self.values.iter().copied().zip(self.weights.iter().copied())
    }
}
