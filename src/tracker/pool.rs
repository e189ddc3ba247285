//! Worker pool running one tracking loop per thread.
use crate::error::Result;

/// Run `worker(index)` once on each of `threads` workers and collect the
/// per-worker results.
#[cfg(feature = "parallel")]
pub fn run_workers<T, F>(threads: usize, worker: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> T + Sync,
{
    use crate::error::TrackingError;

    if threads <= 1 {
        return Ok(vec![worker(0)]);
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("fiber-tracker-{i}"))
        .build()
        .map_err(|e| TrackingError::Config(format!("Failed to build worker pool: {e}")))?;
    Ok(pool.broadcast(|ctx| worker(ctx.index())))
}

#[cfg(not(feature = "parallel"))]
pub fn run_workers<T, F>(_threads: usize, worker: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> T + Sync,
{
    Ok(vec![worker(0)])
}
