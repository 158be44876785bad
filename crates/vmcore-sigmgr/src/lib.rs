// Path: crates/vmcore-sigmgr/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # vmcore-sigmgr
//!
//! The virtual signature manager (spec.md §4.8): a per-session append-only
//! table `app -> set<message>`, bounded by `MAX_COST`, that lets one
//! application authorize another within the same block without real
//! cryptography. `signedMessagesList` (spec.md §6.5) seeds the table before
//! a request's dispatcher runs.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use vmcore_types::{ApplicationError, LongID};

/// The per-session cost bound (spec.md §4.8): each entry costs
/// `len(message) + 8` bytes.
pub const MAX_COST: usize = 128 * 1024;

const ENTRY_OVERHEAD: usize = 8;

#[derive(Debug, Error)]
pub enum SigMgrError {
    #[error("virtual signature table exceeded its {MAX_COST}-byte cost bound")]
    LimitExceeded,
    #[error("no virtual signature from app {issuer} over this message")]
    NotSigned { issuer: LongID },
}

impl SigMgrError {
    /// Materializes this error as the `ApplicationError` a dispatcher call
    /// sees (spec.md §7): both variants are recoverable, not block-fatal.
    pub fn into_application_error(self) -> ApplicationError {
        match self {
            SigMgrError::LimitExceeded => ApplicationError::LimitExceeded(self.to_string()),
            SigMgrError::NotSigned { .. } => ApplicationError::NotFound(self.to_string()),
        }
    }
}

#[derive(Default)]
struct Inner {
    by_app: HashMap<LongID, HashSet<Vec<u8>>>,
    cost: usize,
}

/// The per-request virtual signature table (spec.md §4.8).
#[derive(Default)]
pub struct VirtualSignatureManager {
    inner: Mutex<Inner>,
}

impl VirtualSignatureManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the table from a request's declared `signedMessagesList`
    /// (spec.md §6.5), before the dispatcher runs. Fails `LimitExceeded` if
    /// the seed itself overflows the cost bound — a malformed proposal, not
    /// a runtime fault.
    pub fn seed(&self, entries: impl IntoIterator<Item = (LongID, Vec<u8>)>) -> Result<(), SigMgrError> {
        for (issuer, message) in entries {
            self.sign(&message, issuer)?;
        }
        Ok(())
    }

    /// `sign(msg, issuerApp)` (spec.md §4.8): appends `msg` to `issuerApp`'s
    /// set. Re-signing an already-signed message is a no-op (the table is a
    /// set, not a multiset) and costs nothing further.
    pub fn sign(&self, msg: &[u8], issuer_app: LongID) -> Result<(), SigMgrError> {
        let mut inner = self.inner.lock();
        let set = inner.by_app.entry(issuer_app).or_default();
        if set.contains(msg) {
            return Ok(());
        }
        let entry_cost = msg.len() + ENTRY_OVERHEAD;
        if inner.cost + entry_cost > MAX_COST {
            return Err(SigMgrError::LimitExceeded);
        }
        inner.cost += entry_cost;
        inner.by_app.entry(issuer_app).or_default().insert(msg.to_vec());
        Ok(())
    }

    /// `verify(msg, issuerApp)` (spec.md §4.8): a membership test, leaving
    /// the table unchanged.
    pub fn verify(&self, msg: &[u8], issuer_app: LongID) -> bool {
        self.inner.lock().by_app.get(&issuer_app).is_some_and(|set| set.contains(msg))
    }

    /// `verify_and_invalidate(msg, issuerApp)` (spec.md §4.8): verifies
    /// membership, removes the entry, and refunds its cost. Fails
    /// `NotSigned` if `issuerApp` never signed `msg`.
    pub fn verify_and_invalidate(&self, msg: &[u8], issuer_app: LongID) -> Result<(), SigMgrError> {
        let mut inner = self.inner.lock();
        let removed = inner.by_app.get_mut(&issuer_app).is_some_and(|set| set.remove(msg));
        if !removed {
            return Err(SigMgrError::NotSigned { issuer: issuer_app });
        }
        inner.cost -= msg.len() + ENTRY_OVERHEAD;
        Ok(())
    }

    /// The table's current total cost, for diagnostics and tests.
    pub fn current_cost(&self) -> usize {
        self.inner.lock().cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let mgr = VirtualSignatureManager::new();
        let app = LongID(7);
        mgr.sign(b"transfer:42", app).unwrap();
        assert!(mgr.verify(b"transfer:42", app));
        assert!(!mgr.verify(b"transfer:43", app));
        assert!(!mgr.verify(b"transfer:42", LongID(8)));
    }

    #[test]
    fn verify_and_invalidate_refunds_cost_and_removes_entry() {
        let mgr = VirtualSignatureManager::new();
        let app = LongID(1);
        mgr.sign(b"one-shot", app).unwrap();
        let cost_before = mgr.current_cost();
        assert!(cost_before > 0);
        mgr.verify_and_invalidate(b"one-shot", app).unwrap();
        assert_eq!(mgr.current_cost(), 0);
        assert!(!mgr.verify(b"one-shot", app));
    }

    #[test]
    fn invalidating_an_unsigned_message_is_not_signed() {
        let mgr = VirtualSignatureManager::new();
        let err = mgr.verify_and_invalidate(b"nope", LongID(1)).unwrap_err();
        assert!(matches!(err, SigMgrError::NotSigned { .. }));
    }

    #[test]
    fn resigning_the_same_message_does_not_double_charge() {
        let mgr = VirtualSignatureManager::new();
        let app = LongID(1);
        mgr.sign(b"dup", app).unwrap();
        let cost_after_first = mgr.current_cost();
        mgr.sign(b"dup", app).unwrap();
        assert_eq!(mgr.current_cost(), cost_after_first);
    }

    #[test]
    fn exceeding_the_cost_bound_is_limit_exceeded() {
        let mgr = VirtualSignatureManager::new();
        let app = LongID(1);
        let big = vec![0u8; MAX_COST];
        assert!(mgr.sign(&big, app).is_err());
    }

    #[test]
    fn seed_pre_populates_from_the_declared_signed_messages_list() {
        let mgr = VirtualSignatureManager::new();
        let app = LongID(3);
        mgr.seed([(app, b"a".to_vec()), (app, b"b".to_vec())]).unwrap();
        assert!(mgr.verify(b"a", app));
        assert!(mgr.verify(b"b", app));
    }
}
