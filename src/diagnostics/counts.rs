use crate::tracker::Termination;
use serde::Serialize;

/// How often each propagation pass ended for a given reason.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminationCounts {
    pub excluded: usize,
    pub aborted: usize,
    pub max_length: usize,
    pub curvature: usize,
    pub lost_direction: usize,
    pub step_budget: usize,
}

impl TerminationCounts {
    pub fn record(&mut self, termination: Termination) {
        let slot = match termination {
            Termination::Excluded => &mut self.excluded,
            Termination::Aborted => &mut self.aborted,
            Termination::MaxLength => &mut self.max_length,
            Termination::Curvature => &mut self.curvature,
            Termination::LostDirection => &mut self.lost_direction,
            Termination::StepBudget => &mut self.step_budget,
        };
        *slot += 1;
    }

    pub fn merge(&mut self, other: &Self) {
        self.excluded += other.excluded;
        self.aborted += other.aborted;
        self.max_length += other.max_length;
        self.curvature += other.curvature;
        self.lost_direction += other.lost_direction;
        self.step_budget += other.step_budget;
    }

    pub fn total(&self) -> usize {
        self.excluded
            + self.aborted
            + self.max_length
            + self.curvature
            + self.lost_direction
            + self.step_budget
    }
}

/// Why tracking trials did not produce an accepted fibre.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionCounts {
    /// No usable starting direction at the seed.
    pub no_direction: usize,
    /// Seed lies inside an exclusion region.
    pub seed_excluded: usize,
    /// Streamline entered an exclusion region.
    pub excluded: usize,
    /// Shorter than the minimum tract length, or fewer than two points.
    pub too_short: usize,
    /// Endpoint constraint not met.
    pub constraint: usize,
    /// Interrupted by an abort request.
    pub aborted: usize,
    /// Valid, but the tract limit had already been reached.
    pub over_limit: usize,
}

impl RejectionCounts {
    pub fn merge(&mut self, other: &Self) {
        self.no_direction += other.no_direction;
        self.seed_excluded += other.seed_excluded;
        self.excluded += other.excluded;
        self.too_short += other.too_short;
        self.constraint += other.constraint;
        self.aborted += other.aborted;
        self.over_limit += other.over_limit;
    }

    pub fn total(&self) -> usize {
        self.no_direction
            + self.seed_excluded
            + self.excluded
            + self.too_short
            + self.constraint
            + self.aborted
            + self.over_limit
    }
}

/// Per-worker tallies, merged once all workers have finished.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialCounts {
    pub seeds: usize,
    pub trials: usize,
    pub accepted: usize,
    pub terminations: TerminationCounts,
    pub rejections: RejectionCounts,
}

impl TrialCounts {
    pub fn merge(&mut self, other: &Self) {
        self.seeds += other.seeds;
        self.trials += other.trials;
        self.accepted += other.accepted;
        self.terminations.merge(&other.terminations);
        self.rejections.merge(&other.rejections);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_adds_every_field() {
        let mut a = TrialCounts::default();
        a.terminations.record(Termination::Curvature);
        a.rejections.too_short = 2;
        a.trials = 3;
        let mut b = TrialCounts::default();
        b.terminations.record(Termination::Curvature);
        b.terminations.record(Termination::LostDirection);
        b.rejections.constraint = 1;
        b.trials = 1;
        a.merge(&b);
        assert_eq!(a.trials, 4);
        assert_eq!(a.terminations.curvature, 2);
        assert_eq!(a.terminations.total(), 3);
        assert_eq!(a.rejections.too_short, 2);
        assert_eq!(a.rejections.constraint, 1);
        assert_eq!(a.rejections.total(), 3);
    }
}
