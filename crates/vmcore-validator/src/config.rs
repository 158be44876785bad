// Path: crates/vmcore-validator/src/config.rs
//! `ExecutorConfig`: the one piece of configuration this crate owns,
//! constructed programmatically by the embedding host rather than parsed
//! from a file or CLI flags (out of scope).

use vmcore_executor::MAX_CALL_DEPTH;
use vmcore_heap::MAX_VERSION;
use vmcore_sigmgr::MAX_COST as SIGNATURE_MANAGER_MAX_COST;

/// Tunables for one validator instance. The defaults reproduce the
/// protocol-fixed constants this crate's components already enforce
/// internally; overriding `worker_count` is the one knob a host is expected
/// to actually touch.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    /// Parallelism for `sort_access_blocks` and request-stream loading.
    /// Defaults to twice the available parallelism, matching spec.md §4.7's
    /// worker pool sizing guidance.
    pub worker_count: usize,
    /// The page capacity used for pages the block loader reports but the
    /// page loader has not yet materialized.
    pub default_page_capacity: usize,
    pub max_call_depth: usize,
    pub save_version_cap: u32,
    pub signature_manager_max_cost: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        let parallelism = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self {
            worker_count: parallelism * 2,
            default_page_capacity: 64 * 1024,
            max_call_depth: MAX_CALL_DEPTH,
            save_version_cap: MAX_VERSION,
            signature_manager_max_cost: SIGNATURE_MANAGER_MAX_COST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_worker_count_is_at_least_two() {
        assert!(ExecutorConfig::default().worker_count >= 2);
    }
}
