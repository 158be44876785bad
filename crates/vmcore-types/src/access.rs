// Path: crates/vmcore-types/src/access.rs
//! `AccessType` and the declared (pre-execution) access-block shape shared
//! between the scheduler's collision-clique verifier and the heap
//! modifier's live `AccessBlock` construction (spec.md §3, §4.5, §4.6).

use serde::{Deserialize, Serialize};

/// The four access kinds an `AccessBlock` can declare (spec.md §3).
///
/// Ordering matches the fixed commit/collision order of spec.md §4.6:
/// `check_only < writable < read_only < int_additive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AccessType {
    CheckOnly = 0,
    Writable = 1,
    ReadOnly = 2,
    IntAdditive = 3,
}

impl AccessType {
    /// Whether `self` (as the earlier block `i`) collides with `other` (the
    /// later block `j`) under the table in spec.md §4.6.
    pub fn collides_with(self, other: AccessType) -> bool {
        use AccessType::*;
        match (self, other) {
            (CheckOnly, _) => false,
            (IntAdditive, ReadOnly) | (IntAdditive, Writable) => true,
            (IntAdditive, _) => false,
            (ReadOnly, Writable) | (ReadOnly, IntAdditive) => true,
            (ReadOnly, _) => false,
            (Writable, CheckOnly) => false,
            (Writable, _) => true,
        }
    }
}

/// A declared `(offset, size, type, requestID)` view into a chunk, as
/// carried by `AppRequestInfo::memoryAccessMap` (spec.md §6.5) before any
/// request has executed. `offset` may be negative: `-3`/`-2`/`-1` are the
/// resizing-policy sentinels of spec.md §3. For a sentinel entry (offset
/// `-1`), `new_size` carries the signed bound spec.md §3 names "newSize";
/// `size` is unused (zero) in that case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredAccess {
    pub offset: i64,
    pub size: usize,
    pub access_type: AccessType,
    pub request_id: u32,
    pub new_size: Option<i64>,
}

impl DeclaredAccess {
    pub fn end(&self) -> i64 {
        self.offset + self.size as i64
    }

    /// Whether this entry is one of the three resizing-policy sentinels
    /// (spec.md §3: offset ∈ {-3,-2,-1}).
    pub fn is_sentinel(&self) -> bool {
        self.offset < 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collision_table_matches_spec() {
        assert!(!AccessType::CheckOnly.collides_with(AccessType::Writable));
        assert!(!AccessType::IntAdditive.collides_with(AccessType::IntAdditive));
        assert!(AccessType::IntAdditive.collides_with(AccessType::ReadOnly));
        assert!(AccessType::IntAdditive.collides_with(AccessType::Writable));
        assert!(!AccessType::ReadOnly.collides_with(AccessType::ReadOnly));
        assert!(AccessType::ReadOnly.collides_with(AccessType::Writable));
        assert!(AccessType::Writable.collides_with(AccessType::Writable));
        assert!(!AccessType::Writable.collides_with(AccessType::CheckOnly));
    }

    #[test]
    fn fixed_order_for_commit_and_sort() {
        let mut types = [
            AccessType::IntAdditive,
            AccessType::CheckOnly,
            AccessType::ReadOnly,
            AccessType::Writable,
        ];
        types.sort();
        assert_eq!(
            types,
            [
                AccessType::CheckOnly,
                AccessType::Writable,
                AccessType::ReadOnly,
                AccessType::IntAdditive
            ]
        );
    }
}
