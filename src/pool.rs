//! Bounded pool of shard workers.
//!
//! The index space `[0, total)` is cut into `shards` contiguous ranges, which
//! run on a dedicated rayon pool of `workers` threads. The call returns once
//! every shard has finished. Workers only ever see their own range, so no
//! locking is needed.

use std::ops::Range;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, instrument};

use crate::VcsError;

/// Splits `[0, total)` into at most `shards` ranges of `ceil(total / shards)` elements.
pub fn shard_ranges(total: u64, shards: usize) -> Vec<Range<u64>> {
    if total == 0 || shards == 0 {
        return Vec::new();
    }
    let step = total.div_ceil(shards as u64);
    (0..shards as u64)
        .map(|i| (i * step).min(total)..((i + 1) * step).min(total))
        .filter(|range| !range.is_empty())
        .collect()
}

/// Runs `job` once per shard, with at most `workers` shards in flight, and
/// returns the results in shard order.
///
/// # Errors
///
/// [`VcsError::InvalidConfig`] for zero workers, [`VcsError::Backend`] if the
/// pool cannot be built, otherwise the first error a shard returned.
#[instrument(level = "debug", skip_all, fields(total, shards, workers))]
pub fn run_sharded<T, F>(
    total: u64,
    shards: usize,
    workers: usize,
    job: F,
) -> Result<Vec<T>, VcsError>
where
    T: Send,
    F: Fn(usize, Range<u64>) -> Result<T, VcsError> + Sync,
{
    if workers == 0 {
        return Err(VcsError::InvalidConfig("workers must be > 0".into()));
    }
    let ranges = shard_ranges(total, shards);
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|err| VcsError::Backend(format!("shard pool: {}", err)))?;

    let results = pool.install(|| {
        ranges
            .into_par_iter()
            .enumerate()
            .map(|(shard, range)| job(shard, range))
            .collect::<Result<Vec<_>, _>>()
    })?;
    debug!(shards = results.len(), "shards joined");
    Ok(results)
}
