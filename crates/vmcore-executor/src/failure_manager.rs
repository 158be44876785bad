// Path: crates/vmcore-executor/src/failure_manager.rs
//! `FailureManager` (spec.md §4.7): deterministic per-invocation resource
//! reductions, seeded from the proposer-supplied `stackSizeFailures`/
//! `cpuTimeFailures` sets, so a validator replaying the block reproduces the
//! exact same fate (timeout or stack fault) the proposer observed.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use vmcore_types::ApplicationError;

/// The maximum nested call depth (spec.md §4.7).
pub const MAX_CALL_DEPTH: usize = 16;

const NORMAL_STACK_SIZE: usize = 2 * 1024 * 1024;
const REDUCED_STACK_SIZE: usize = 1024 * 1024;
const NORMAL_NS_PER_GAS: u64 = 300_000;
const REDUCED_NS_PER_GAS: u64 = 150_000;

/// Holds the proposer-supplied failure sets and hands out monotonic
/// invocation ids (spec.md §4.7: "indexed by invocation id, a monotonic
/// per-request counter").
pub struct FailureManager {
    stack_size_failures: HashSet<u64>,
    cpu_time_failures: HashSet<u64>,
    next_invocation_id: AtomicU64,
}

impl FailureManager {
    pub fn new(stack_size_failures: HashSet<u64>, cpu_time_failures: HashSet<u64>) -> Self {
        Self {
            stack_size_failures,
            cpu_time_failures,
            next_invocation_id: AtomicU64::new(0),
        }
    }

    pub fn next_invocation_id(&self) -> u64 {
        self.next_invocation_id.fetch_add(1, Ordering::SeqCst)
    }

    /// `getExecTime(id, gas)` (spec.md §4.7): `gas * (FailCheck ? 150k :
    /// 300k)` nanoseconds.
    pub fn get_exec_time(&self, invocation_id: u64, gas: u64) -> Duration {
        let ns_per_gas = if self.cpu_time_failures.contains(&invocation_id) {
            REDUCED_NS_PER_GAS
        } else {
            NORMAL_NS_PER_GAS
        };
        Duration::from_nanos(gas.saturating_mul(ns_per_gas))
    }

    /// `getStackSize(id)` (spec.md §4.7): 1 MiB under a declared failure,
    /// else 2 MiB.
    pub fn get_stack_size(&self, invocation_id: u64) -> usize {
        if self.stack_size_failures.contains(&invocation_id) {
            REDUCED_STACK_SIZE
        } else {
            NORMAL_STACK_SIZE
        }
    }

    /// Depth above `MAX_CALL_DEPTH` fails `LimitExceeded` (spec.md §4.7).
    pub fn check_depth(depth: usize) -> Result<(), ApplicationError> {
        if depth > MAX_CALL_DEPTH {
            return Err(ApplicationError::LimitExceeded(format!(
                "call depth {depth} exceeds the maximum of {MAX_CALL_DEPTH}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_cpu_time_failure_halves_the_ns_per_gas_rate() {
        let fm = FailureManager::new(HashSet::new(), HashSet::from([7u64]));
        assert_eq!(fm.get_exec_time(7, 1000), Duration::from_nanos(150_000_000));
        assert_eq!(fm.get_exec_time(8, 1000), Duration::from_nanos(300_000_000));
    }

    #[test]
    fn declared_stack_size_failure_halves_the_budget() {
        let fm = FailureManager::new(HashSet::from([3u64]), HashSet::new());
        assert_eq!(fm.get_stack_size(3), REDUCED_STACK_SIZE);
        assert_eq!(fm.get_stack_size(4), NORMAL_STACK_SIZE);
    }

    #[test]
    fn depth_beyond_the_maximum_is_limit_exceeded() {
        assert!(FailureManager::check_depth(MAX_CALL_DEPTH).is_ok());
        assert!(FailureManager::check_depth(MAX_CALL_DEPTH + 1).is_err());
    }

    #[test]
    fn invocation_ids_are_monotonic() {
        let fm = FailureManager::new(HashSet::new(), HashSet::new());
        assert_eq!(fm.next_invocation_id(), 0);
        assert_eq!(fm.next_invocation_id(), 1);
        assert_eq!(fm.next_invocation_id(), 2);
    }
}
