//! Run orchestration: setup, seeding, parallel tracking and finalisation.
use super::estimator::DirectionEstimator;
use super::masks::{MaskInputs, TrackingMasks};
use super::output::{TractSink, TractogramOutput};
use super::params::{StepGeometry, TrackerParams};
use super::pool::run_workers;
use super::propagator::{StreamlinePropagator, Termination};
use super::provenance::Provenance;
use super::run_state::{RunState, TrackingControl};
use super::seeds::{seeds_from_mask, shuffle_seeds};
use super::validator::FiberValidator;
use crate::diagnostics::timing::elapsed_ms;
use crate::diagnostics::{SeedingStage, TimingBreakdown, TrackingReport, TrialCounts};
use crate::error::Result;
use crate::proposer::{DirectionHistory, DirectionProposer, TrackingMode};
use crate::types::{FiberEnd, Streamline};
use log::{debug, info};
use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;

/// Starting directions shorter than this do not start a streamline.
const MIN_START_NORM: f32 = 1e-4;
/// Progress is only logged when at least this many seeds separate two lines.
const MIN_PROGRESS_INTERVAL: usize = 100;

/// Product of [`StreamlineTracker::run`].
#[derive(Clone, Debug)]
pub struct TrackingResult {
    pub output: TractogramOutput,
    pub report: TrackingReport,
}

/// Streamline tracker driving a [`DirectionProposer`] from a set of seeds.
///
/// Typical usage:
/// ```no_run
/// use fiber_tracker::prelude::*;
///
/// # fn example(peaks: VectorVolume) -> fiber_tracker::Result<()> {
/// let proposer = PeakProposer::new(peaks, TrackingMode::Deterministic);
/// let mut tracker = StreamlineTracker::new(Box::new(proposer), TrackerParams::default());
/// let result = tracker.run()?;
/// println!("{}", result.report.status);
/// # Ok(())
/// # }
/// ```
pub struct StreamlineTracker {
    proposer: Box<dyn DirectionProposer>,
    prior: Option<Box<dyn DirectionProposer>>,
    masks: MaskInputs,
    seed_points: Option<Vec<Point3<f32>>>,
    params: TrackerParams,
    control: TrackingControl,
}

/// Everything a worker needs, borrowed for the duration of the run.
struct TrackingContext<'r> {
    propagator: StreamlinePropagator<'r>,
    estimator: &'r DirectionEstimator<'r>,
    validator: FiberValidator<'r, 'r>,
    masks: &'r TrackingMasks<'r>,
    sink: &'r TractSink,
    state: &'r RunState,
    seeds: &'r [Point3<f32>],
    params: &'r TrackerParams,
    mode: TrackingMode,
    rng_seed: u64,
    progress_interval: Option<usize>,
}

impl StreamlineTracker {
    pub fn new(proposer: Box<dyn DirectionProposer>, params: TrackerParams) -> Self {
        Self {
            proposer,
            prior: None,
            masks: MaskInputs::default(),
            seed_points: None,
            params,
            control: TrackingControl::default(),
        }
    }

    pub fn params(&self) -> &TrackerParams {
        &self.params
    }

    pub fn set_params(&mut self, params: TrackerParams) {
        self.params = params;
    }

    /// Replace the region masks. Unset masks fall back to neutral defaults.
    pub fn set_masks(&mut self, masks: MaskInputs) {
        self.masks = masks;
    }

    /// Track from these points instead of deriving seeds from the seed mask.
    /// The points are consumed by the next [`run`](Self::run); later runs
    /// fall back to the seed mask unless new points are set.
    pub fn set_seed_points(&mut self, seeds: Vec<Point3<f32>>) {
        self.seed_points = Some(seeds);
    }

    /// Second proposer blended into every step direction.
    pub fn set_prior(&mut self, prior: Box<dyn DirectionProposer>) {
        self.prior = Some(prior);
    }

    /// Handle for aborting, pausing and monitoring the run from another
    /// thread.
    pub fn control(&self) -> TrackingControl {
        self.control.clone()
    }

    /// Reconstruct streamlines from every seed.
    ///
    /// Configuration problems are reported before any worker starts; once
    /// tracking runs, individual streamline failures only show up in the
    /// report counts.
    pub fn run(&mut self) -> Result<TrackingResult> {
        let total_start = Instant::now();
        let mut timings = TimingBreakdown::default();
        self.params.validate()?;

        let setup_start = Instant::now();
        let geometry = self.proposer.geometry().clone();
        let step = StepGeometry::resolve(&self.params, geometry.min_spacing());
        self.proposer.set_angular_threshold(step.angular_threshold_cos);
        self.proposer.init_for_tracking();
        if let Some(prior) = self.prior.as_mut() {
            prior.set_angular_threshold(step.angular_threshold_cos);
            prior.init_for_tracking();
        }

        let params = &self.params;
        let proposer: &dyn DirectionProposer = self.proposer.as_ref();
        let prior: Option<&dyn DirectionProposer> = self.prior.as_deref();
        let masks = TrackingMasks::resolve(&self.masks, &geometry, params.interpolate_masks);

        let constraint = params
            .endpoint_constraint
            .auto_select(masks.seed_set(), masks.target_set());
        if constraint != params.endpoint_constraint {
            info!(
                "No endpoint constraint chosen but {} set, using {}",
                if masks.seed_set() {
                    "seed and target image"
                } else {
                    "target image"
                },
                constraint
            );
        }
        let validator = FiberValidator::new(constraint, &masks);
        validator.check(&Streamline::from_points([Point3::origin(); 2]))?;
        timings.stage_since("setup", setup_start);

        let seeding_start = Instant::now();
        let rng_seed = params.rng_seed.unwrap_or_else(|| {
            if params.random {
                rand::random()
            } else {
                0
            }
        });
        let mut run_rng = StdRng::seed_from_u64(rng_seed);
        let explicit = self.seed_points.is_some();
        let mut seeds = match self.seed_points.take() {
            Some(points) => points,
            None => seeds_from_mask(&masks, params.seeds_per_voxel, &mut run_rng),
        };
        if params.random {
            shuffle_seeds(&mut seeds, &mut run_rng);
        }
        timings.stage_since("seeding", seeding_start);

        let threads = params.worker_count();
        let mode = proposer.mode();
        info!("StreamlineTracking - Mode: {:?}", mode);
        if mode == TrackingMode::Probabilistic {
            info!("StreamlineTracking - Trials per seed: {}", params.trials_per_seed);
        }
        info!("StreamlineTracking - Endpoint constraint: {}", constraint);
        info!(
            "StreamlineTracking - Angular threshold: {:.3} ({:.1}°)",
            step.angular_threshold_cos,
            step.angular_threshold_cos.clamp(-1.0, 1.0).acos().to_degrees()
        );
        info!("StreamlineTracking - Stepsize: {:.3}mm", step.step_size);
        info!("StreamlineTracking - Seeds: {}", seeds.len());
        info!(
            "StreamlineTracking - Tract length: {}-{}mm, threads: {}",
            params.min_tract_length, params.max_tract_length, threads
        );

        let tracking_start = Instant::now();
        let state = self.control.state();
        state.begin(seeds.len(), params.max_num_tracts);
        let sink = if params.output_density_map {
            TractSink::density(&geometry)
        } else {
            TractSink::fibers()
        };
        let estimator = DirectionEstimator::new(
            proposer,
            prior,
            &masks,
            &params.sampling,
            &params.prior,
            step.sampling_distance,
            params.random,
        );
        let interval = seeds.len() / 100;
        let ctx = TrackingContext {
            propagator: StreamlinePropagator::new(
                &estimator,
                &masks,
                &geometry,
                state,
                step,
                params.max_tract_length,
                params.max_steps,
                params.loop_check_deg,
                params.sampling.num_previous_directions,
            ),
            estimator: &estimator,
            validator: FiberValidator::new(constraint, &masks),
            masks: &masks,
            sink: &sink,
            state,
            seeds: &seeds,
            params,
            mode,
            rng_seed,
            progress_interval: (interval >= MIN_PROGRESS_INTERVAL).then_some(interval),
        };
        let per_worker = run_workers(threads, |worker| ctx.track(worker))?;
        let mut counts = TrialCounts::default();
        for c in &per_worker {
            counts.merge(c);
        }
        timings.stage_since("tracking", tracking_start);

        let finalize_start = Instant::now();
        let aborted = state.aborted();
        let output = sink.finalize();
        if let TractogramOutput::Fibers(fibers) = &output {
            info!("Reconstructed {} fibers.", fibers.len());
        }
        timings.stage_since("finalize", finalize_start);
        timings.total_ms = elapsed_ms(total_start);
        info!("Tracking took {:.3}s", timings.total_ms / 1000.0);

        let report = TrackingReport {
            mode,
            model: proposer.model(),
            endpoint_constraint: constraint,
            step,
            threads,
            seeding: SeedingStage {
                total: seeds.len(),
                explicit,
                shuffled: params.random,
                rng_seed,
            },
            seeds_tried: state.progress(),
            accepted: state.accepted(),
            max_num_tracts: params.max_num_tracts,
            aborted,
            counts,
            provenance: Provenance::describe(mode, proposer.model(), proposer.interpolates()),
            status: state.status_text(),
            timings,
        };
        state.clear_abort();
        Ok(TrackingResult { output, report })
    }
}

impl TrackingContext<'_> {
    /// Worker loop: claim seeds until they run out or the run halts.
    fn track(&self, worker: usize) -> TrialCounts {
        let mut counts = TrialCounts::default();
        while let Some(index) = self.state.next_seed() {
            self.state.wait_while_paused();
            let done = self.state.mark_seed_done();
            counts.seeds += 1;
            if let Some(interval) = self.progress_interval {
                if done % interval == 0 {
                    self.log_progress(done);
                }
            }
            self.track_seed(index, &mut counts);
        }
        debug!(
            "worker {worker}: {} seeds, {} trials, {} accepted",
            counts.seeds, counts.trials, counts.accepted
        );
        counts
    }

    fn log_progress(&self, done: usize) {
        let total = self.state.total_seeds().max(1);
        let pct = 100.0 * done as f64 / total as f64;
        match self.params.max_num_tracts {
            Some(max) => info!(
                "Tried: {done}/{total} ({pct:.0}%) | Accepted: {}/{max}",
                self.state.accepted()
            ),
            None => info!(
                "Tried: {done}/{total} ({pct:.0}%) | Accepted: {}",
                self.state.accepted()
            ),
        }
    }

    fn trial_rng(&self, seed_index: usize, trial: usize) -> StdRng {
        let mixed = (seed_index as u64)
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .wrapping_add(trial as u64);
        StdRng::seed_from_u64(self.rng_seed ^ mixed)
    }

    /// Probabilistic seeds are retried until one trial succeeds.
    fn track_seed(&self, index: usize, counts: &mut TrialCounts) {
        let seed = self.seeds[index];
        let trials = match self.mode {
            TrackingMode::Deterministic => 1,
            TrackingMode::Probabilistic => self.params.trials_per_seed,
        };
        for trial in 0..trials {
            if self.state.should_halt() {
                break;
            }
            counts.trials += 1;
            let mut rng = self.trial_rng(index, trial);
            if self.track_trial(seed, &mut rng, counts) {
                counts.accepted += 1;
                break;
            }
        }
    }

    fn track_trial(&self, seed: Point3<f32>, rng: &mut StdRng, counts: &mut TrialCounts) -> bool {
        let dir = self
            .estimator
            .propose_step(&seed, &DirectionHistory::new(), [0, 0, 0], rng)
            * 0.5;
        if self.masks.in_exclusion(&seed) {
            counts.rejections.seed_excluded += 1;
            return false;
        }
        if dir.norm() <= MIN_START_NORM {
            counts.rejections.no_direction += 1;
            return false;
        }

        let mut fiber = Streamline::new();
        let forward = self
            .propagator
            .follow(seed, dir, &mut fiber, 0.0, FiberEnd::Back, rng);
        counts.terminations.record(forward.termination);
        fiber.points.push_front(seed);

        let mut result = forward;
        if !forward.excluded() {
            result = self
                .propagator
                .follow(seed, -dir, &mut fiber, forward.length, FiberEnd::Front, rng);
            counts.terminations.record(result.termination);
        }

        let rejections = &mut counts.rejections;
        if result.excluded() {
            rejections.excluded += 1;
            return false;
        }
        if forward.termination == Termination::Aborted
            || result.termination == Termination::Aborted
        {
            rejections.aborted += 1;
            return false;
        }
        if result.length < self.params.min_tract_length || fiber.len() < 2 {
            rejections.too_short += 1;
            return false;
        }
        if !self.validator.is_valid(&fiber) {
            rejections.constraint += 1;
            return false;
        }
        let accepted = self.state.accept_with(|| self.sink.commit(fiber));
        if !accepted {
            rejections.over_limit += 1;
        }
        accepted
    }
}
