//! Vector-valued voxel volume holding one axial direction per voxel.
//!
//! Peak directions are sign-ambiguous (`v` and `-v` describe the same
//! fibre orientation), so interpolation aligns every corner to a
//! reference orientation before blending.
use super::geometry::GridGeometry;
use super::traits::VoxelField;
use nalgebra::{Point3, Vector3};

const MIN_NORM: f32 = 1e-6;

#[derive(Clone, Debug)]
pub struct VectorVolume {
    geometry: GridGeometry,
    data: Vec<Vector3<f32>>,
}

impl VectorVolume {
    pub fn zeros(geometry: GridGeometry) -> Self {
        let n = geometry.voxel_count();
        Self {
            geometry,
            data: vec![Vector3::zeros(); n],
        }
    }

    pub fn from_fn(
        geometry: GridGeometry,
        mut f: impl FnMut(usize, usize, usize) -> Vector3<f32>,
    ) -> Self {
        let mut vol = Self::zeros(geometry);
        let [nx, ny, nz] = vol.geometry.dims;
        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    let i = vol.geometry.linear_index(x, y, z);
                    vol.data[i] = f(x, y, z);
                }
            }
        }
        vol
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> Vector3<f32> {
        self.data[self.geometry.linear_index(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, v: Vector3<f32>) {
        let i = self.geometry.linear_index(x, y, z);
        self.data[i] = v;
    }

    /// Direction at `world`, zero outside the grid.
    ///
    /// With `interpolate`, the eight corner vectors are flipped to agree
    /// with `reference` (or with the first non-zero corner when the
    /// reference is degenerate) and blended trilinearly.
    pub fn sample_aligned(
        &self,
        world: &Point3<f32>,
        reference: &Vector3<f32>,
        interpolate: bool,
    ) -> Vector3<f32> {
        if !interpolate {
            return self.nearest(world).unwrap_or_else(Vector3::zeros);
        }
        let Some(corners) = self.corners(world) else {
            return Vector3::zeros();
        };
        let mut anchor = *reference;
        if anchor.norm() < MIN_NORM {
            anchor = corners
                .values
                .iter()
                .copied()
                .find(|v| v.norm() >= MIN_NORM)
                .unwrap_or_else(Vector3::zeros);
        }
        let mut acc = Vector3::zeros();
        for (v, w) in corners.iter() {
            let aligned = if v.dot(&anchor) < 0.0 { -v } else { v };
            acc += aligned * w;
        }
        acc
    }
}

impl VoxelField for VectorVolume {
    type Voxel = Vector3<f32>;

    #[inline]
    fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    #[inline]
    fn voxel(&self, x: usize, y: usize, z: usize) -> Vector3<f32> {
        self.get(x, y, z)
    }
}
