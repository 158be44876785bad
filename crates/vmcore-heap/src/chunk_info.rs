// Path: crates/vmcore-heap/src/chunk_info.rs
//! `ChunkInfo` (spec.md §3, §4.4): per-request, per-chunk state — the
//! ordered data access blocks plus the resizing policy inferred from the
//! sentinel access block at a negative offset.

use crate::access_block::{AccessBlock, AccessBlockError};
use std::collections::BTreeMap;
use thiserror::Error;
use vmcore_storage::ChunkBoundsInfo;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkInfoError {
    #[error("chunk size is not accessible under this request's declared access")]
    NotAccessible,
    #[error("missing size bounds for a resizable chunk")]
    MissingSizeBounds,
    #[error("proposed size {proposed} is outside the declared bound [{lower}, {upper}]")]
    InvalidSizeBounds { proposed: i64, lower: i64, upper: i64 },
    #[error(transparent)]
    AccessBlock(#[from] AccessBlockError),
}

/// The resizing policy for a chunk within one request, inferred from the
/// first (sentinel) declared access block's offset (spec.md §3):
/// - `-3`: `NonAccessible`
/// - `-2`: `ReadOnly`
/// - `-1`, `newSize > 0`: `Expandable { max_size }`
/// - `-1`, `newSize <= 0`: `Shrinkable { min_size }`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizingPolicy {
    NonAccessible,
    ReadOnly,
    Expandable { max_size: usize },
    Shrinkable { min_size: usize },
}

impl ResizingPolicy {
    pub fn from_sentinel(offset: i64, new_size: i64) -> Option<Self> {
        match offset {
            -3 => Some(ResizingPolicy::NonAccessible),
            -2 => Some(ResizingPolicy::ReadOnly),
            -1 if new_size > 0 => Some(ResizingPolicy::Expandable {
                max_size: new_size as usize,
            }),
            -1 => Some(ResizingPolicy::Shrinkable {
                min_size: (-new_size) as usize,
            }),
            _ => None,
        }
    }

    pub fn is_resizable(self) -> bool {
        matches!(self, ResizingPolicy::Expandable { .. } | ResizingPolicy::Shrinkable { .. })
    }
}

/// A dedicated, versioned `u64` slot for a chunk's size — kept separate
/// from the chunk's real byte buffer (unlike a data `AccessBlock`, the size
/// block has no backing chunk offset to read/write through; committing it
/// instead calls `Chunk::set_size` directly, spec.md §4.5 commit step 2).
#[derive(Debug, Clone, Default)]
struct SizeBlock {
    versions: Vec<(u32, u64)>,
}

impl SizeBlock {
    fn current(&self, initial: u64) -> u64 {
        self.versions.last().map(|(_, v)| *v).unwrap_or(initial)
    }

    fn write(&mut self, value: u64, current_version: u32) {
        match self.versions.last_mut() {
            Some((number, v)) if *number == current_version => *v = value,
            _ => self.versions.push((current_version, value)),
        }
    }

    fn restore_version(&mut self, v: u32) {
        self.versions.retain(|(number, _)| *number <= v);
    }
}

/// Per-request, per-chunk state: the ordered data access blocks (offset ≥
/// 0), the dedicated size block (spec.md §9 Open Question (a): unified
/// `RestrictedModifier` semantics — a size block always exists, even for
/// `NonAccessible` chunks, where it simply rejects access), and the
/// resizing policy.
pub struct ChunkInfo {
    pub policy: ResizingPolicy,
    pub bounds: Option<ChunkBoundsInfo>,
    pub initial_size: usize,
    size_block: SizeBlock,
    /// Ordered by offset ascending; ties within an offset keep proposer
    /// insertion order (already resolved by the scheduler's fixed sort,
    /// spec.md §4.6).
    data_blocks: BTreeMap<usize, Vec<AccessBlock>>,
}

impl ChunkInfo {
    pub fn new(policy: ResizingPolicy, bounds: Option<ChunkBoundsInfo>, initial_size: usize) -> Self {
        Self {
            policy,
            bounds,
            initial_size,
            size_block: SizeBlock::default(),
            data_blocks: BTreeMap::new(),
        }
    }

    pub fn insert_data_block(&mut self, block: AccessBlock) {
        self.data_blocks.entry(block.offset).or_default().push(block);
    }

    /// Every data access block in ascending-offset order (spec.md §4.5
    /// commit step 3).
    pub fn data_blocks_in_order(&self) -> impl Iterator<Item = &AccessBlock> {
        self.data_blocks.values().flatten()
    }

    pub fn data_blocks_in_order_mut(&mut self) -> impl Iterator<Item = &mut AccessBlock> {
        self.data_blocks.values_mut().flatten()
    }

    /// `get_chunk_size()` (spec.md §4.5): the size block's contents, unless
    /// the policy is `NonAccessible`.
    pub fn get_chunk_size(&self) -> Result<u64, ChunkInfoError> {
        if self.policy == ResizingPolicy::NonAccessible {
            return Err(ChunkInfoError::NotAccessible);
        }
        Ok(self.size_block.current(self.initial_size as u64))
    }

    /// `update_chunk_size(n)` (spec.md §4.5): validates `n` against the
    /// recorded bound and `initial_size` per policy, then stores to the size
    /// block.
    pub fn update_chunk_size(&mut self, n: u64, current_version: u32) -> Result<(), ChunkInfoError> {
        match self.policy {
            ResizingPolicy::NonAccessible | ResizingPolicy::ReadOnly => {
                return Err(ChunkInfoError::NotAccessible);
            }
            ResizingPolicy::Expandable { max_size } => {
                if n as usize > max_size {
                    return Err(ChunkInfoError::InvalidSizeBounds {
                        proposed: n as i64,
                        lower: self.initial_size as i64,
                        upper: max_size as i64,
                    });
                }
            }
            ResizingPolicy::Shrinkable { min_size } => {
                if (n as usize) < min_size {
                    return Err(ChunkInfoError::InvalidSizeBounds {
                        proposed: n as i64,
                        lower: min_size as i64,
                        upper: self.initial_size as i64,
                    });
                }
            }
        }
        if let Some(bounds) = self.bounds {
            if n < bounds.size_lower_bound || n > bounds.size_upper_bound {
                return Err(ChunkInfoError::InvalidSizeBounds {
                    proposed: n as i64,
                    lower: bounds.size_lower_bound as i64,
                    upper: bounds.size_upper_bound as i64,
                });
            }
        }
        self.size_block.write(n, current_version);
        Ok(())
    }

    /// Seeds the size block with `initial_size` at version 0 so
    /// `get_chunk_size` returns a sensible value before any write.
    pub fn seed_size(&mut self) {
        if self.policy == ResizingPolicy::NonAccessible {
            return;
        }
        self.size_block.write(self.initial_size as u64, 0);
    }

    pub fn restore_version(&mut self, v: u32) {
        self.size_block.restore_version(v);
        for block in self.data_blocks.values_mut().flatten() {
            block.restore_version(v);
        }
    }

    /// The final size as recorded at `current_version`, used by
    /// `write_to_heap` (spec.md §4.5 commit step 1).
    pub fn final_size(&self) -> Result<u64, ChunkInfoError> {
        if self.policy == ResizingPolicy::NonAccessible {
            return Ok(self.initial_size as u64);
        }
        self.get_chunk_size()
    }
}

impl PartialEq for ResizingPolicy {
    fn eq(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (ResizingPolicy::NonAccessible, ResizingPolicy::NonAccessible)
                | (ResizingPolicy::ReadOnly, ResizingPolicy::ReadOnly)
                | (ResizingPolicy::Expandable { .. }, ResizingPolicy::Expandable { .. })
                | (ResizingPolicy::Shrinkable { .. }, ResizingPolicy::Shrinkable { .. })
        )
    }
}
impl Eq for ResizingPolicy {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_offsets_map_to_the_spec_table() {
        assert_eq!(ResizingPolicy::from_sentinel(-3, 0), Some(ResizingPolicy::NonAccessible));
        assert_eq!(ResizingPolicy::from_sentinel(-2, 0), Some(ResizingPolicy::ReadOnly));
        assert_eq!(
            ResizingPolicy::from_sentinel(-1, 10),
            Some(ResizingPolicy::Expandable { max_size: 10 })
        );
        assert_eq!(
            ResizingPolicy::from_sentinel(-1, -4),
            Some(ResizingPolicy::Shrinkable { min_size: 4 })
        );
        assert_eq!(ResizingPolicy::from_sentinel(0, 0), None);
    }

    #[test]
    fn non_accessible_rejects_get_chunk_size() {
        let info = ChunkInfo::new(ResizingPolicy::NonAccessible, None, 5);
        assert_eq!(info.get_chunk_size(), Err(ChunkInfoError::NotAccessible));
    }

    #[test]
    fn expandable_rejects_size_above_max() {
        let mut info = ChunkInfo::new(ResizingPolicy::Expandable { max_size: 10 }, None, 5);
        info.seed_size();
        assert!(info.update_chunk_size(11, 1).is_err());
        assert!(info.update_chunk_size(10, 1).is_ok());
    }

    #[test]
    fn shrinkable_rejects_size_below_min() {
        let mut info = ChunkInfo::new(ResizingPolicy::Shrinkable { min_size: 4 }, None, 5);
        info.seed_size();
        assert!(info.update_chunk_size(3, 1).is_err());
        assert!(info.update_chunk_size(4, 1).is_ok());
    }
}
