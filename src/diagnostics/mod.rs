//! Diagnostics data model returned alongside a tractogram.
//!
//! `TrackingReport` is the entry point: it records the resolved step
//! geometry, seeding summary, per-cause termination and rejection counts
//! and a timing breakdown of the run stages. Everything serializes to
//! camelCase JSON for the demo tooling.

pub mod counts;
pub mod report;
pub mod timing;

pub use counts::{RejectionCounts, TerminationCounts, TrialCounts};
pub use report::{SeedingStage, TrackingReport};
pub use timing::{StageTiming, TimingBreakdown};
