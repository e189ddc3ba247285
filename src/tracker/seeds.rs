//! Seed point generation.
use super::masks::TrackingMasks;
use crate::volume::VoxelField;
use log::debug;
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

/// One seed at the centre of every positive seed voxel that lies inside the
/// tracking mask, plus `seeds_per_voxel - 1` seeds jittered uniformly within
/// half a voxel of that centre.
pub fn seeds_from_mask(
    masks: &TrackingMasks<'_>,
    seeds_per_voxel: usize,
    rng: &mut StdRng,
) -> Vec<Point3<f32>> {
    let seed = masks.seed_volume();
    let geom = seed.geometry();
    let mut seeds = Vec::new();
    for index in geom.indices() {
        if !seed.voxel_at(index).is_some_and(|v| v > 0.0) {
            continue;
        }
        let centre = geom.index_to_world(index);
        if !masks.in_tracking(&centre) {
            continue;
        }
        seeds.push(centre);
        let base = Vector3::new(index[0] as f32, index[1] as f32, index[2] as f32);
        for _ in 1..seeds_per_voxel {
            let jitter = Vector3::new(
                rng.gen_range(-0.5..0.5),
                rng.gen_range(-0.5..0.5),
                rng.gen_range(-0.5..0.5),
            );
            seeds.push(geom.continuous_index_to_world(&(base + jitter)));
        }
    }
    debug!(
        "seeds_from_mask: {} seeds ({} per voxel)",
        seeds.len(),
        seeds_per_voxel
    );
    seeds
}

/// Randomise the processing order of the seeds.
pub fn shuffle_seeds(seeds: &mut [Point3<f32>], rng: &mut StdRng) {
    seeds.shuffle(rng);
}
