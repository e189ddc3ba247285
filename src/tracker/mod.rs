//! Streamline tracking engine.
//!
//! Overview
//! - [`StreamlineTracker`] resolves step geometry and masks, derives seeds,
//!   then runs one worker loop per thread. Each worker claims seeds from a
//!   shared cursor and grows a streamline forward and backward from the
//!   seed.
//! - Every step asks the [`DirectionEstimator`] for a new direction: the
//!   proposer's direction at the current position averaged with probes on a
//!   small point shell around it. Zero means "stop here".
//! - Finished streamlines are checked for length, exclusion and the
//!   [`EndpointConstraint`] before being committed to the output sink.
//!
//! Modules
//! - `params`: run parameters and derived step geometry.
//! - `neighborhood`: deterministic probe directions.
//! - `masks`: tracking, stopping, seed, target and exclusion regions.
//! - `estimator`: per-step direction estimation with stop votes and
//!   deflection.
//! - `propagator`: one-directional growth and the curvature check.
//! - `validator`: endpoint constraints.
//! - `seeds`: seed points from the seed mask.
//! - `run_state`: seed cursor, acceptance counter, abort and pause.
//! - `output`: fibre collection or density map.
//! - `provenance`: algorithm and model tags for the output.
//! - `pool`: worker threads.
//! - `pipeline`: the orchestrator.

pub mod estimator;
pub mod masks;
pub mod neighborhood;
pub mod output;
pub mod params;
mod pipeline;
mod pool;
pub mod propagator;
pub mod provenance;
pub mod run_state;
pub mod seeds;
pub mod validator;

pub use estimator::DirectionEstimator;
pub use masks::{MaskInputs, TrackingMasks};
pub use neighborhood::create_directions;
pub use output::TractogramOutput;
pub use params::{PriorParams, SamplingParams, StepGeometry, TrackerParams};
pub use pipeline::{StreamlineTracker, TrackingResult};
pub use propagator::{curvature_deviation, Propagation, StreamlinePropagator, Termination};
pub use provenance::{Code, Provenance};
pub use run_state::TrackingControl;
pub use validator::{EndpointConstraint, FiberValidator};
