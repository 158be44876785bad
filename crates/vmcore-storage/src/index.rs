// Path: crates/vmcore-storage/src/index.rs
//! `ChunkIndex` (spec.md §4.4): for the lifetime of a block, the read/write
//! map from `FullID` to `Chunk` and the map from `FullID` to
//! `ChunkBoundsInfo`. Constructed from the readonly/writable page lists plus
//! the proposer-supplied size bounds.

use crate::chunk::{Chunk, ChunkError};
use crate::page::Page;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use vmcore_types::FullID;

#[derive(Debug, Error)]
pub enum ChunkIndexError {
    #[error("missing proof of non-existence for chunk {0}")]
    MissingProofOfNonExistence(FullID),
    #[error("chunk error: {0}")]
    Chunk(#[from] ChunkError),
    #[error("page carries an identifier that does not decode to a well-formed FullID: {0}")]
    CorruptIdentifier(vmcore_types::prefix_trie::PrefixTrieError),
}

/// The proposer-supplied size bounds for a resizable chunk (spec.md §3,
/// §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBoundsInfo {
    pub size_lower_bound: u64,
    pub size_upper_bound: u64,
}

/// The block-lifetime read/write map from `FullID` to `Chunk`, plus the
/// proposer's declared size bounds per chunk (spec.md §4.4).
pub struct ChunkIndex {
    chunks: DashMap<FullID, Arc<Chunk>>,
    bounds: BTreeMap<FullID, ChunkBoundsInfo>,
}

impl ChunkIndex {
    /// Walks every page's native and migrant chunks, indexing each by its
    /// decoded `FullID`, then calls `reserve(sizeUpperBound)` once per
    /// bounded chunk — the only pre-block resize (spec.md §4.4).
    pub fn build(
        readonly_pages: &[Page],
        writable_pages: &[Page],
        bounds: BTreeMap<FullID, ChunkBoundsInfo>,
    ) -> Result<Self, ChunkIndexError> {
        let chunks = DashMap::new();
        for page in readonly_pages.iter().chain(writable_pages.iter()) {
            for (var_id, chunk) in page.chunks() {
                let full_id = var_id.decode().map_err(ChunkIndexError::CorruptIdentifier)?;
                chunks.insert(full_id, chunk.clone());
            }
        }

        for (id, bound) in &bounds {
            if let Some(chunk) = chunks.get(id) {
                chunk.reserve(bound.size_upper_bound as usize)?;
            }
        }

        Ok(Self { chunks, bounds })
    }

    /// Returns the chunk for `id`, or `MissingProofOfNonExistence` — a block
    /// error (spec.md §4.4, §7).
    pub fn get_chunk(&self, id: &FullID) -> Result<Arc<Chunk>, ChunkIndexError> {
        self.chunks
            .get(id)
            .map(|c| c.clone())
            .ok_or(ChunkIndexError::MissingProofOfNonExistence(*id))
    }

    pub fn bounds_for(&self, id: &FullID) -> Option<ChunkBoundsInfo> {
        self.bounds.get(id).copied()
    }

    pub fn contains(&self, id: &FullID) -> bool {
        self.chunks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmcore_types::{LongID, VarLenFullID};

    fn page_with(app: u64, account: u64, local: u64, capacity: usize) -> Page {
        let id = FullID::new(LongID(app), LongID(account), LongID(local));
        let var_id = VarLenFullID::encode(&id).unwrap();
        Page::new_empty(var_id, capacity, 0, true).unwrap()
    }

    #[test]
    fn missing_chunk_is_proof_of_nonexistence_error() {
        let pages = vec![page_with(1, 2, 3, 64)];
        let index = ChunkIndex::build(&[], &pages, BTreeMap::new()).unwrap();
        let present = FullID::new(LongID(1), LongID(2), LongID(3));
        assert!(index.get_chunk(&present).is_ok());

        let missing = FullID::new(LongID(9), LongID(9), LongID(9));
        assert!(matches!(
            index.get_chunk(&missing),
            Err(ChunkIndexError::MissingProofOfNonExistence(_))
        ));
    }

    #[test]
    fn bounds_drive_a_one_time_reserve() {
        let pages = vec![page_with(1, 2, 3, 64)];
        let id = FullID::new(LongID(1), LongID(2), LongID(3));
        let mut bounds = BTreeMap::new();
        bounds.insert(
            id,
            ChunkBoundsInfo {
                size_lower_bound: 0,
                size_upper_bound: 32,
            },
        );
        let index = ChunkIndex::build(&[], &pages, bounds).unwrap();
        assert_eq!(index.bounds_for(&id).unwrap().size_upper_bound, 32);
    }
}
