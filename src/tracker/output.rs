//! Accumulation of accepted streamlines.
//!
//! A run writes either into a fibre collection or into a visitation count
//! volume. The sink is only written from inside the acceptance critical
//! section, its own lock merely makes it shareable across workers.
use crate::types::Streamline;
use crate::volume::{GridGeometry, ScalarVolume, VoxelField};
use log::debug;
use std::sync::{Mutex, PoisonError};

#[derive(Debug)]
enum SinkData {
    Fibers(Vec<Streamline>),
    Density(ScalarVolume),
}

#[derive(Debug)]
pub struct TractSink {
    data: Mutex<SinkData>,
}

/// Final product of a run.
#[derive(Clone, Debug)]
pub enum TractogramOutput {
    /// Accepted streamlines, in acceptance order.
    Fibers(Vec<Streamline>),
    /// Streamline visitation density, rescaled to [0, 1].
    Density(ScalarVolume),
}

impl TractogramOutput {
    pub fn fibers(&self) -> Option<&[Streamline]> {
        match self {
            Self::Fibers(fibers) => Some(fibers),
            Self::Density(_) => None,
        }
    }

    pub fn density(&self) -> Option<&ScalarVolume> {
        match self {
            Self::Density(map) => Some(map),
            Self::Fibers(_) => None,
        }
    }
}

impl TractSink {
    pub fn fibers() -> Self {
        Self {
            data: Mutex::new(SinkData::Fibers(Vec::new())),
        }
    }

    /// Density sink on `geometry` (the proposer grid).
    pub fn density(geometry: &GridGeometry) -> Self {
        Self {
            data: Mutex::new(SinkData::Density(ScalarVolume::zeros(geometry.clone()))),
        }
    }

    pub fn commit(&self, fiber: Streamline) {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        match &mut *data {
            SinkData::Fibers(fibers) => fibers.push(fiber),
            SinkData::Density(map) => add_visits(map, &fiber),
        }
    }

    pub fn finalize(self) -> TractogramOutput {
        match self.data.into_inner().unwrap_or_else(PoisonError::into_inner) {
            SinkData::Fibers(fibers) => {
                debug!("TractSink::finalize: {} fibers", fibers.len());
                TractogramOutput::Fibers(fibers)
            }
            SinkData::Density(mut map) => {
                let (_, hi) = map.min_max();
                debug!("TractSink::finalize: density peak count {hi}");
                map.rescale_unit();
                TractogramOutput::Density(map)
            }
        }
    }
}

/// Increment the voxel of every point whose voxel differs from the previous
/// point's voxel. Points outside the grid are skipped.
fn add_visits(map: &mut ScalarVolume, fiber: &Streamline) {
    let geom = map.geometry().clone();
    let buffer = map.as_mut_slice();
    let mut last = None;
    for p in &fiber.points {
        let index = geom.world_to_index(p);
        if last == Some(index) {
            continue;
        }
        if let Some(i) = geom.checked_linear_index(index) {
            buffer[i] += 1.0;
        }
        last = Some(index);
    }
}
