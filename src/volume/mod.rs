//! Voxel grids: geometry, scalar masks and vector (peak) fields.
pub mod geometry;
pub mod scalar;
pub mod traits;
pub mod vector;

pub use self::geometry::{GridGeometry, VoxelIndex};
pub use self::scalar::{ScalarVolume, MASK_THRESHOLD};
pub use self::traits::{Corners, VoxelField};
pub use self::vector::VectorVolume;
