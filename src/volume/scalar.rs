//! Scalar voxel volume used for masks, label maps and density output.
//!
//! Storage is either a dense buffer (x fastest) or a single constant value
//! covering the whole grid. Constant volumes stand in for masks the caller
//! did not provide, so the tracking hot path never branches on "mask set".
use super::geometry::GridGeometry;
use super::traits::VoxelField;
use nalgebra::Point3;

/// Membership threshold applied to mask values.
pub const MASK_THRESHOLD: f32 = 0.5;

#[derive(Clone, Debug)]
enum Storage {
    Dense(Vec<f32>),
    Constant(f32),
}

#[derive(Clone, Debug)]
pub struct ScalarVolume {
    geometry: GridGeometry,
    storage: Storage,
}

impl ScalarVolume {
    /// Zero-initialised dense volume.
    pub fn zeros(geometry: GridGeometry) -> Self {
        let n = geometry.voxel_count();
        Self {
            geometry,
            storage: Storage::Dense(vec![0.0; n]),
        }
    }

    /// Volume with the same value in every voxel, without a voxel buffer.
    pub fn constant(geometry: GridGeometry, value: f32) -> Self {
        Self {
            geometry,
            storage: Storage::Constant(value),
        }
    }

    /// Wrap an existing buffer; `None` when its length does not match the grid.
    pub fn from_vec(geometry: GridGeometry, data: Vec<f32>) -> Option<Self> {
        (data.len() == geometry.voxel_count()).then_some(Self {
            geometry,
            storage: Storage::Dense(data),
        })
    }

    /// Build a volume by evaluating `f` at every voxel index.
    pub fn from_fn(geometry: GridGeometry, mut f: impl FnMut(usize, usize, usize) -> f32) -> Self {
        let [nx, ny, nz] = geometry.dims;
        let mut data = Vec::with_capacity(geometry.voxel_count());
        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    data.push(f(x, y, z));
                }
            }
        }
        Self {
            geometry,
            storage: Storage::Dense(data),
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.storage, Storage::Constant(_))
    }

    /// Dense voxel buffer, `None` for constant volumes.
    pub fn as_slice(&self) -> Option<&[f32]> {
        match &self.storage {
            Storage::Dense(data) => Some(data),
            Storage::Constant(_) => None,
        }
    }

    /// Mutable voxel buffer. Constant volumes are expanded first.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        if let Storage::Constant(v) = self.storage {
            self.storage = Storage::Dense(vec![v; self.geometry.voxel_count()]);
        }
        match &mut self.storage {
            Storage::Dense(data) => data,
            Storage::Constant(_) => &mut [],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> f32 {
        match &self.storage {
            Storage::Dense(data) => data[self.geometry.linear_index(x, y, z)],
            Storage::Constant(v) => *v,
        }
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, v: f32) {
        let i = self.geometry.linear_index(x, y, z);
        self.as_mut_slice()[i] = v;
    }

    /// Value at `world`: trilinear when `interpolate`, else nearest voxel.
    /// Positions outside the grid yield 0.
    pub fn sample(&self, world: &Point3<f32>, interpolate: bool) -> f32 {
        if let Storage::Constant(v) = self.storage {
            return if self.geometry.contains_world(world) { v } else { 0.0 };
        }
        if interpolate {
            self.corners(world)
                .map(|c| c.iter().map(|(v, w)| v * w).sum())
                .unwrap_or(0.0)
        } else {
            self.nearest(world).unwrap_or(0.0)
        }
    }

    /// Mask membership: inside the grid and sampled value >= 0.5.
    #[inline]
    pub fn is_inside(&self, world: &Point3<f32>, interpolate: bool) -> bool {
        self.geometry.contains_world(world) && self.sample(world, interpolate) >= MASK_THRESHOLD
    }

    pub fn min_max(&self) -> (f32, f32) {
        match &self.storage {
            Storage::Constant(v) => (*v, *v),
            Storage::Dense(data) => data.iter().fold((f32::MAX, f32::MIN), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            }),
        }
    }

    /// Linear min-max rescale into [0, 1]. A flat volume maps to 0.
    pub fn rescale_unit(&mut self) {
        let (lo, hi) = self.min_max();
        let range = hi - lo;
        for v in self.as_mut_slice() {
            *v = if range > 0.0 { (*v - lo) / range } else { 0.0 };
        }
    }
}

impl VoxelField for ScalarVolume {
    type Voxel = f32;

    #[inline]
    fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    #[inline]
    fn voxel(&self, x: usize, y: usize, z: usize) -> f32 {
        self.get(x, y, z)
    }
}
