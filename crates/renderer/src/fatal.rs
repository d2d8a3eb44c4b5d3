//! Process termination for broken synchronisation invariants.

use std::thread;

/// Logs `reason` with the slot and calling thread, then aborts.
///
/// Used where continuing would risk two workers touching the same GPU
/// resources.
#[cold]
pub fn abort(slot: Option<usize>, reason: &str) -> ! {
    let current = thread::current();
    let thread_name = current.name().unwrap_or("<unnamed>");
    let thread_id = current.id();

    match slot {
        Some(slot) => tracing::error!(
            slot,
            thread = thread_name,
            ?thread_id,
            "fatal frame scheduling error: {}",
            reason
        ),
        None => tracing::error!(
            thread = thread_name,
            ?thread_id,
            "fatal frame scheduling error: {}",
            reason
        ),
    }
    std::process::abort()
}
