// Path: crates/vmcore-telemetry/src/scope_timer.rs
//! A simple RAII timer for measuring the duration of a scope, adapted from
//! the teacher's `ioi-telemetry::time::Timer`. The teacher's version reports
//! into a `ConsensusMetricsSink`; this crate carries no metrics surface
//! (SPEC_FULL.md §4 ambient stack), so `ScopeTimer` instead emits a
//! `tracing` event on drop, which is the one observability channel this
//! library keeps.

use std::time::Instant;

/// Logs `label`'s elapsed wall-clock time at `DEBUG` when dropped. Used
/// around the block validator's orchestration stages (spec.md §4.9):
/// `prepare_pages`, `ChunkIndex` construction, `loadRequests`,
/// `checkDependencyGraph`, `execute`, `commit`/`rollback`.
pub struct ScopeTimer {
    label: &'static str,
    start: Instant,
}

impl ScopeTimer {
    pub fn new(label: &'static str) -> Self {
        Self { label, start: Instant::now() }
    }
}

impl Drop for ScopeTimer {
    fn drop(&mut self) {
        tracing::debug!(stage = self.label, elapsed_us = self.start.elapsed().as_micros() as u64, "stage complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_does_not_panic_without_a_subscriber() {
        let _timer = ScopeTimer::new("test-stage");
    }
}
