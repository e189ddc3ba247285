//! Streamline tractography on regular 3D grids.
//!
//! Starting from seed points, the tracker repeatedly asks a
//! [`DirectionProposer`] for the local fibre direction, smooths it over a
//! small neighbourhood, and steps along it until the streamline leaves
//! tissue, turns too sharply or grows too long. Accepted streamlines are
//! collected into a tractogram or a visitation density map.
//!
//! The direction models themselves are external; [`PeakProposer`] follows a
//! precomputed peak field and is enough to drive the engine end to end.

// Public modules
pub mod config;
pub mod density;
pub mod diagnostics;
pub mod error;
pub mod io;
pub mod proposer;
pub mod tracker;
pub mod types;
pub mod volume;

// Helpers
pub mod angle;

// --- High-level re-exports -------------------------------------------------

pub use crate::error::{Result, TrackingError};
pub use crate::proposer::{DirectionProposer, ModelFamily, PeakProposer, TrackingMode};
pub use crate::tracker::{
    EndpointConstraint, MaskInputs, StreamlineTracker, TrackerParams, TrackingControl,
    TrackingResult, TractogramOutput,
};
pub use crate::types::Streamline;
pub use crate::volume::{GridGeometry, ScalarVolume, VectorVolume};

pub use crate::diagnostics::TrackingReport;

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use fiber_tracker::prelude::*;
/// use nalgebra::Vector3;
///
/// # fn main() -> fiber_tracker::Result<()> {
/// let geometry = GridGeometry::isotropic([32, 32, 32], 1.0);
/// let peaks = VectorVolume::from_fn(geometry, |_, _, _| Vector3::x());
/// let proposer = PeakProposer::new(peaks, TrackingMode::Deterministic);
///
/// let mut tracker = StreamlineTracker::new(Box::new(proposer), TrackerParams::default());
/// let result = tracker.run()?;
/// println!("{}", result.report.status);
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::{
        EndpointConstraint, GridGeometry, MaskInputs, PeakProposer, ScalarVolume,
        StreamlineTracker, TrackerParams, TrackingMode, VectorVolume,
    };
}
