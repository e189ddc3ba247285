//! Run-wide state shared by the tracking workers and external controllers.
//!
//! Workers pull seed indices from an atomic cursor. Acceptance of a fibre,
//! the accepted counter and the stop flag form one critical section so
//! that no fibre beyond `max_num_tracts` is ever accepted, even when
//! several workers finish at the same time.
use log::info;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

#[derive(Debug, Default)]
pub struct RunState {
    cursor: AtomicUsize,
    progress: AtomicUsize,
    total_seeds: AtomicUsize,
    /// Zero means unlimited.
    max_tracts: AtomicUsize,
    accepted: AtomicUsize,
    stop: AtomicBool,
    abort: AtomicBool,
    paused: AtomicBool,
    accept_lock: Mutex<()>,
    pause_lock: Mutex<bool>,
    pause_cv: Condvar,
}

impl RunState {
    /// Reset counters for a new run. Abort and pause requests are kept so
    /// that a controller may pause a run before it starts.
    pub fn begin(&self, total_seeds: usize, max_tracts: Option<usize>) {
        self.cursor.store(0, Ordering::SeqCst);
        self.progress.store(0, Ordering::SeqCst);
        self.accepted.store(0, Ordering::SeqCst);
        self.total_seeds.store(total_seeds, Ordering::SeqCst);
        self.max_tracts
            .store(max_tracts.unwrap_or(0), Ordering::SeqCst);
        self.stop.store(false, Ordering::SeqCst);
    }

    /// Claim the next seed index, `None` once seeds run out or the run
    /// was stopped or aborted.
    pub fn next_seed(&self) -> Option<usize> {
        if self.should_halt() {
            return None;
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed);
        (i < self.total_seeds.load(Ordering::Relaxed)).then_some(i)
    }

    /// Count one processed seed; returns the new total.
    pub fn mark_seed_done(&self) -> usize {
        self.progress.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Run `commit` and count the fibre unless the target count was
    /// already reached. Sets the stop flag when this acceptance reaches it.
    pub fn accept_with(&self, commit: impl FnOnce()) -> bool {
        let _guard = self
            .accept_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.stop.load(Ordering::SeqCst) {
            return false;
        }
        commit();
        let accepted = self.accepted.fetch_add(1, Ordering::SeqCst) + 1;
        let max = self.max_tracts.load(Ordering::SeqCst);
        if max > 0 && accepted >= max {
            info!(
                "Reconstructed maximum number of tracts ({}). Stopping tractography.",
                accepted
            );
            self.stop.store(true, Ordering::SeqCst);
        }
        true
    }

    #[inline]
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn aborted(&self) -> bool {
        self.abort.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn should_halt(&self) -> bool {
        self.stop_requested() || self.aborted()
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    pub fn progress(&self) -> usize {
        self.progress.load(Ordering::Relaxed)
    }

    pub fn total_seeds(&self) -> usize {
        self.total_seeds.load(Ordering::Relaxed)
    }

    pub fn abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
        // Wake paused workers so they observe the abort.
        let _guard = self.pause_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.pause_cv.notify_all();
    }

    /// Clear a previous abort so the tracker can be run again.
    pub fn clear_abort(&self) {
        self.abort.store(false, Ordering::SeqCst);
    }

    pub fn pause(&self) {
        let mut paused = self.pause_lock.lock().unwrap_or_else(PoisonError::into_inner);
        *paused = true;
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        let mut paused = self.pause_lock.lock().unwrap_or_else(PoisonError::into_inner);
        *paused = false;
        self.paused.store(false, Ordering::SeqCst);
        self.pause_cv.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Block the calling worker while the run is paused (and not aborted).
    pub fn wait_while_paused(&self) {
        if !self.paused.load(Ordering::Acquire) {
            return;
        }
        let mut paused = self.pause_lock.lock().unwrap_or_else(PoisonError::into_inner);
        while *paused && !self.aborted() {
            paused = self
                .pause_cv
                .wait(paused)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// `"<tried>/<total> seeds, <accepted>[/<max>] fibers"`.
    pub fn status_text(&self) -> String {
        let max = self.max_tracts.load(Ordering::SeqCst);
        let fibers = if max > 0 {
            format!("{}/{}", self.accepted(), max)
        } else {
            self.accepted().to_string()
        };
        format!(
            "{}/{} seeds, {} fibers",
            self.progress(),
            self.total_seeds(),
            fibers
        )
    }
}

/// Cloneable handle for observing and steering a run from other threads.
#[derive(Clone, Debug, Default)]
pub struct TrackingControl {
    state: Arc<RunState>,
}

impl TrackingControl {
    pub(crate) fn state(&self) -> &RunState {
        &self.state
    }

    /// Abort the run: in-flight fibres are dropped at their next step.
    pub fn abort(&self) {
        self.state.abort();
    }

    /// Freeze all workers mid-step until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.state.pause();
    }

    pub fn resume(&self) {
        self.state.resume();
    }

    pub fn is_paused(&self) -> bool {
        self.state.is_paused()
    }

    pub fn accepted(&self) -> usize {
        self.state.accepted()
    }

    pub fn progress(&self) -> usize {
        self.state.progress()
    }

    pub fn status_text(&self) -> String {
        self.state.status_text()
    }
}
