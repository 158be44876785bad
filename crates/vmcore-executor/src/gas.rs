// Path: crates/vmcore-executor/src/gas.rs
//! Gas forwarding (spec.md §4.7): an invocation inherits
//! `(parent.remainingExternalGas * forwardedGas) / 256` and halves it
//! geometrically across descendants, so the sum of descendant budgets
//! approaches `2/3` of the parent's.

use vmcore_types::ApplicationError;

/// The per-invocation floor below which a forwarded gas share is rejected
/// outright rather than handed to a callee that could never make progress
/// with it (spec.md §4.7 `min_clocks`). The source leaves this tunable;
/// this crate fixes it at a small constant (DESIGN.md open question).
pub const MIN_CLOCKS: u64 = 64;

/// `(parentRemainingExternalGas * forwardedGas) / 256` (spec.md §4.7).
/// `forwarded_gas` is the numerator over 256 the caller offered the callee.
pub fn forward(parent_remaining_external_gas: u64, forwarded_gas: u8) -> u64 {
    (parent_remaining_external_gas * forwarded_gas as u64) / 256
}

/// Geometric halving applied to each subsequent descendant's share of an
/// already-forwarded budget.
pub fn halve(gas: u64) -> u64 {
    gas / 2
}

/// Fails `InvalidOperation` when the inherited budget falls below the
/// per-invocation minimum (spec.md §4.7).
pub fn check_min_clocks(gas: u64, min_clocks: u64) -> Result<(), ApplicationError> {
    if gas < min_clocks {
        return Err(ApplicationError::InvalidOperation("forwarded gas is too low".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_applies_the_256_denominator() {
        assert_eq!(forward(2560, 128), 1280);
        assert_eq!(forward(2560, 0), 0);
    }

    #[test]
    fn halving_descendants_approaches_two_thirds_of_parent() {
        let parent = 3000u64;
        let remaining = forward(parent, u8::MAX);
        let mut sum = 0u64;
        let mut share = remaining;
        for _ in 0..10 {
            sum += share;
            share = halve(share);
        }
        assert!(sum < parent);
    }

    #[test]
    fn below_min_clocks_is_rejected() {
        assert!(check_min_clocks(10, 20).is_err());
        assert!(check_min_clocks(20, 20).is_ok());
    }
}
