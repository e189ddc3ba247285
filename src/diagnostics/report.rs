use super::counts::TrialCounts;
use super::timing::TimingBreakdown;
use crate::proposer::{ModelFamily, TrackingMode};
use crate::tracker::{EndpointConstraint, Provenance, StepGeometry};
use serde::Serialize;

/// Seed set used by a run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedingStage {
    pub total: usize,
    /// Seeds were passed in explicitly rather than derived from the seed mask.
    pub explicit: bool,
    pub shuffled: bool,
    pub rng_seed: u64,
}

/// Summary of one tracking run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingReport {
    pub mode: TrackingMode,
    pub model: ModelFamily,
    pub endpoint_constraint: EndpointConstraint,
    pub step: StepGeometry,
    pub threads: usize,
    pub seeding: SeedingStage,
    /// Seeds claimed by a worker before the run ended.
    pub seeds_tried: usize,
    pub accepted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_num_tracts: Option<usize>,
    pub aborted: bool,
    pub counts: TrialCounts,
    pub provenance: Provenance,
    pub status: String,
    pub timings: TimingBreakdown,
}

impl TrackingReport {
    /// Multi-line human-readable summary used by the demo binary.
    pub fn summary(&self) -> String {
        let c = &self.counts;
        let mut out = String::new();
        out.push_str(&format!(
            "mode={:?} constraint={} threads={}\n",
            self.mode, self.endpoint_constraint, self.threads
        ));
        out.push_str(&format!(
            "step={:.3}mm angle_cos={:.3} sampling={:.3}mm\n",
            self.step.step_size, self.step.angular_threshold_cos, self.step.sampling_distance
        ));
        out.push_str(&format!("{}\n", self.status));
        out.push_str(&format!(
            "trials={} terminations: lost={} curvature={} max_length={} excluded={} budget={}\n",
            c.trials,
            c.terminations.lost_direction,
            c.terminations.curvature,
            c.terminations.max_length,
            c.terminations.excluded,
            c.terminations.step_budget
        ));
        out.push_str(&format!(
            "rejected: no_dir={} short={} excluded={} constraint={} over_limit={}\n",
            c.rejections.no_direction,
            c.rejections.too_short,
            c.rejections.excluded + c.rejections.seed_excluded,
            c.rejections.constraint,
            c.rejections.over_limit
        ));
        out.push_str(&format!("total_ms={:.1}", self.timings.total_ms));
        out
    }
}
