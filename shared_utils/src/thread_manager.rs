//! Worker Count Selection
//!
//! The pool defaults to one worker per logical CPU. An explicit request
//! wins, but never drops below one worker.

use std::sync::OnceLock;

/// Cached logical CPU count for this process.
static CPU_COUNT: OnceLock<usize> = OnceLock::new();

pub fn available_cpus() -> usize {
    *CPU_COUNT.get_or_init(|| num_cpus::get().max(1))
}

/// Worker count for a batch: `requested` if given (clamped to ≥ 1),
/// otherwise the number of logical CPUs.
pub fn resolve_worker_count(requested: Option<usize>) -> usize {
    match requested {
        Some(n) => n.max(1),
        None => available_cpus(),
    }
}
