// Path: crates/vmcore-heap/src/modifier.rs
//! `HeapModifier` (spec.md §3, §4.5): the per-request transactional
//! sandbox over a restricted set of chunks, built by
//! [`build_modifier`] from a `ChunkIndex` and a request's declared access
//! map.

use crate::access_block::{AccessBlock, AccessBlockError};
use crate::chunk_info::{ChunkInfo, ChunkInfoError, ResizingPolicy};
use crate::pod::Pod;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;
use vmcore_storage::{Chunk, ChunkError, ChunkIndex, ChunkIndexError};
use vmcore_types::{AccessType, DeclaredAccess, FullID, LongID, LongLongID};

/// The monotonic version counter's protocol cap (spec.md §4.5).
pub const MAX_VERSION: u32 = 30_000;

#[derive(Debug, Error)]
pub enum HeapModifierError {
    #[error("save_version exceeded the protocol cap of {MAX_VERSION}")]
    LimitExceeded,
    #[error("restore_version target {0} is not a valid prior version")]
    InvalidRestoreTarget(u32),
    #[error("no app context is loaded")]
    NoContext,
    #[error("chunk is not defined in this request's declared access")]
    ChunkNotDefined,
    #[error("sentinel offset {0} does not map to a resizing policy")]
    InvalidSentinel(i64),
    #[error("missing size bound for resizable chunk")]
    MissingSizeBounds,
    #[error(transparent)]
    AccessBlock(#[from] AccessBlockError),
    #[error(transparent)]
    ChunkInfo(#[from] ChunkInfoError),
    #[error(transparent)]
    ChunkIndex(#[from] ChunkIndexError),
    #[error(transparent)]
    Chunk(#[from] ChunkError),
}

/// One application's chunk map within a `HeapModifier`, keyed by the
/// `LongLongID` that names a chunk within an app (spec.md §3).
type AppChunkMap = HashMap<LongLongID, ChunkInfo>;

/// The per-request transactional sandbox (spec.md §4.5): an append-only
/// `currentVersion` counter, a pointer to the active `ChunkInfo`, and a map
/// `app -> chunk -> ChunkInfo`.
pub struct HeapModifier {
    current_version: u32,
    apps: HashMap<LongID, AppChunkMap>,
    active_app: Option<LongID>,
    active_chunk: Option<LongLongID>,
}

impl HeapModifier {
    fn new() -> Self {
        Self {
            current_version: 0,
            apps: HashMap::new(),
            active_app: None,
            active_chunk: None,
        }
    }

    /// `load_context(app)` (spec.md §4.5): selects the per-app chunk map, or
    /// marks "no context" if absent — not fatal, used by nested calls.
    pub fn load_context(&mut self, app: LongID) {
        self.active_app = self.apps.contains_key(&app).then_some(app);
        self.active_chunk = None;
    }

    pub fn has_context(&self) -> bool {
        self.active_app.is_some()
    }

    /// `load_chunk(id)` (spec.md §4.5): selects the current chunk; failure
    /// is `ChunkNotDefined`.
    pub fn load_chunk(&mut self, chunk: LongLongID) -> Result<(), HeapModifierError> {
        let app = self.active_app.ok_or(HeapModifierError::NoContext)?;
        let map = self.apps.get(&app).ok_or(HeapModifierError::NoContext)?;
        if !map.contains_key(&chunk) {
            return Err(HeapModifierError::ChunkNotDefined);
        }
        self.active_chunk = Some(chunk);
        Ok(())
    }

    fn active_info(&self) -> Result<&ChunkInfo, HeapModifierError> {
        let app = self.active_app.ok_or(HeapModifierError::NoContext)?;
        let chunk = self.active_chunk.ok_or(HeapModifierError::ChunkNotDefined)?;
        self.apps
            .get(&app)
            .and_then(|m| m.get(&chunk))
            .ok_or(HeapModifierError::ChunkNotDefined)
    }

    fn active_info_mut(&mut self) -> Result<&mut ChunkInfo, HeapModifierError> {
        let app = self.active_app.ok_or(HeapModifierError::NoContext)?;
        let chunk = self.active_chunk.ok_or(HeapModifierError::ChunkNotDefined)?;
        self.apps
            .get_mut(&app)
            .and_then(|m| m.get_mut(&chunk))
            .ok_or(HeapModifierError::ChunkNotDefined)
    }

    fn find_data_block(&self, offset: usize, index: usize) -> Result<&AccessBlock, HeapModifierError> {
        let info = self.active_info()?;
        info.data_blocks_in_order()
            .filter(|b| b.offset == offset)
            .nth(index)
            .ok_or(HeapModifierError::ChunkNotDefined)
    }

    fn find_data_block_mut(&mut self, offset: usize, index: usize) -> Result<&mut AccessBlock, HeapModifierError> {
        let info = self.active_info_mut()?;
        info.data_blocks_in_order_mut()
            .filter(|b| b.offset == offset)
            .nth(index)
            .ok_or(HeapModifierError::ChunkNotDefined)
    }

    /// `read<T>(offset, index)` (spec.md §4.5).
    pub fn read<T: Pod>(&self, offset: usize, index: usize) -> Result<T, HeapModifierError> {
        Ok(self.find_data_block(offset, index)?.read::<T>()?)
    }

    /// `write<T>(offset, value, index)` (spec.md §4.5).
    pub fn write<T: Pod>(&mut self, offset: usize, value: T, index: usize) -> Result<(), HeapModifierError> {
        let v = self.current_version;
        Ok(self.find_data_block_mut(offset, index)?.write(value, v)?)
    }

    /// `add_int<T>(offset)` (spec.md §4.5): the unique `int_additive` block
    /// at `offset` (index 0, since additive blocks at a shared offset are
    /// mergeable per spec.md §4.6 and never duplicated within one request).
    pub fn add_int<T: Pod>(&mut self, offset: usize, delta: T) -> Result<(), HeapModifierError> {
        let v = self.current_version;
        Ok(self.find_data_block_mut(offset, 0)?.add_int(delta, v)?)
    }

    /// `save_version() -> v` (spec.md §4.5): capped at `MAX_VERSION`.
    pub fn save_version(&mut self) -> Result<u32, HeapModifierError> {
        if self.current_version >= MAX_VERSION {
            return Err(HeapModifierError::LimitExceeded);
        }
        self.current_version += 1;
        Ok(self.current_version)
    }

    pub fn current_version(&self) -> u32 {
        self.current_version
    }

    /// `restore_version(v)` (spec.md §4.5): drops every version `> v` in
    /// every access block, across every app and chunk.
    pub fn restore_version(&mut self, v: u32) -> Result<(), HeapModifierError> {
        if v >= self.current_version {
            return Err(HeapModifierError::InvalidRestoreTarget(v));
        }
        for map in self.apps.values_mut() {
            for info in map.values_mut() {
                info.restore_version(v);
            }
        }
        self.current_version = v;
        Ok(())
    }

    /// `get_chunk_size()` (spec.md §4.5): the active chunk's size block.
    pub fn get_chunk_size(&self) -> Result<u64, HeapModifierError> {
        Ok(self.active_info()?.get_chunk_size()?)
    }

    /// `update_chunk_size(n)` (spec.md §4.5).
    pub fn update_chunk_size(&mut self, n: u64) -> Result<(), HeapModifierError> {
        let v = self.current_version;
        Ok(self.active_info_mut()?.update_chunk_size(n, v)?)
    }

    /// `write_to_heap()` (spec.md §4.5 commit): a no-op at version 0.
    /// Otherwise, for every app and chunk: reads the final size, applies it
    /// via `Chunk::set_size` for resizable policies, then (if `final > 0`)
    /// commits non-sentinel access blocks in offset order, stopping once
    /// `offset >= final`. `chunk_lookup` resolves `(app, chunk)` back to the
    /// live `Chunk` the blocks were built against.
    pub fn write_to_heap(
        &self,
        chunk_lookup: impl Fn(LongID, LongLongID) -> Option<Arc<Chunk>>,
    ) -> Result<(), HeapModifierError> {
        if self.current_version == 0 {
            return Ok(());
        }
        for (&app, map) in &self.apps {
            for (&chunk_id, info) in map {
                let final_size = info.final_size()?;
                if info.policy.is_resizable() {
                    if let Some(chunk) = chunk_lookup(app, chunk_id) {
                        chunk.set_size(final_size as usize)?;
                    }
                }
                if final_size == 0 {
                    continue;
                }
                for block in info.data_blocks_in_order() {
                    if block.offset as u64 >= final_size {
                        break;
                    }
                    let commit_len = (final_size - block.offset as u64) as usize;
                    block.write_to_heap(commit_len.min(block.size))?;
                }
            }
        }
        trace!(version = self.current_version, "heap modifier committed to underlying chunks");
        Ok(())
    }
}

/// Per-chunk declared access, grouped by `(app, chunk)`, already sorted and
/// ordered by offset — the shape produced by the scheduler's
/// `sort_access_blocks` (spec.md §4.6).
pub type AccessMap = BTreeMap<(LongID, LongLongID), Vec<DeclaredAccess>>;

/// `ChunkIndex::build_modifier(access_map) -> HeapModifier` (spec.md §4.4):
/// for each `(appID, chunkID, declared accesses)`, determines the resizing
/// policy from the first (sentinel) access block, range-checks a proposed
/// new size against `ChunkBoundsInfo` when resizable, and constructs access
/// blocks for every remaining (non-sentinel) declared access. Lives in this
/// crate rather than `vmcore_storage` to avoid a dependency cycle (the
/// modifier needs `ChunkIndex`, not the reverse).
pub fn build_modifier(index: &ChunkIndex, access_map: &AccessMap) -> Result<HeapModifier, HeapModifierError> {
    let mut modifier = HeapModifier::new();

    for (&(app, chunk_id), entries) in access_map {
        let full_id = FullID { app, id: chunk_id };
        let chunk = index.get_chunk(&full_id)?;
        let initial_size = chunk.size();

        let Some(sentinel) = entries.iter().find(|e| e.is_sentinel()) else {
            continue;
        };
        let new_size = sentinel.new_size.unwrap_or(0);
        let policy = ResizingPolicy::from_sentinel(sentinel.offset, new_size)
            .ok_or(HeapModifierError::InvalidSentinel(sentinel.offset))?;

        let bounds = index.bounds_for(&full_id);
        if policy.is_resizable() && bounds.is_none() {
            return Err(HeapModifierError::MissingSizeBounds);
        }

        let mut info = ChunkInfo::new(policy, bounds, initial_size);
        info.seed_size();

        for entry in entries.iter().filter(|e| !e.is_sentinel()) {
            let block = AccessBlock::new(entry.offset as usize, entry.size, entry.access_type, chunk.clone());
            info.insert_data_block(block);
        }

        modifier.apps.entry(app).or_default().insert(chunk_id, info);
    }

    Ok(modifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;
    use vmcore_storage::{ChunkBoundsInfo, Page};
    use vmcore_types::VarLenFullID;

    fn build_index_with(app: u64, account: u64, local: u64, capacity: usize, bound_upper: u64) -> (ChunkIndex, FullID) {
        let id = FullID::new(LongID(app), LongID(account), LongID(local));
        let var_id = VarLenFullID::encode(&id).unwrap();
        let page = Page::new_empty(var_id, capacity, 0, true).unwrap();
        let mut bounds = Map::new();
        bounds.insert(
            id,
            ChunkBoundsInfo {
                size_lower_bound: 0,
                size_upper_bound: bound_upper,
            },
        );
        (ChunkIndex::build(&[], &[page], bounds).unwrap(), id)
    }

    #[test]
    fn s1_two_additive_requests_accumulate() {
        let (index, id) = build_index_with(1, 2, 3, 16, 16);
        let mut access_map = AccessMap::new();
        access_map.insert(
            (id.app, id.id),
            vec![
                DeclaredAccess {
                    offset: -2,
                    size: 0,
                    access_type: AccessType::ReadOnly,
                    request_id: 0,
                    new_size: None,
                },
                DeclaredAccess {
                    offset: 0,
                    size: 8,
                    access_type: AccessType::IntAdditive,
                    request_id: 0,
                    new_size: None,
                },
            ],
        );

        let chunk = index.get_chunk(&id).unwrap();
        let mut modifier = build_modifier(&index, &access_map).unwrap();

        modifier.load_context(id.app);
        modifier.load_chunk(id.id).unwrap();
        let _v1 = modifier.save_version().unwrap();
        modifier.add_int::<u64>(0, 1234).unwrap();
        let _v2 = modifier.save_version().unwrap();
        modifier.add_int::<u64>(0, 556_677).unwrap();

        modifier.write_to_heap(|_app, _chunk| Some(chunk.clone())).unwrap();

        let bytes = chunk.read_at(0, 8).unwrap();
        assert_eq!(u64::from_le_bytes(bytes.try_into().unwrap()), 557_911);
    }

    #[test]
    fn no_op_commit_at_version_zero() {
        let (index, id) = build_index_with(1, 2, 3, 16, 16);
        let access_map = AccessMap::new();
        let modifier = build_modifier(&index, &access_map).unwrap();
        let chunk = index.get_chunk(&id).unwrap();
        modifier.write_to_heap(|_, _| Some(chunk.clone())).unwrap();
    }

    #[test]
    fn restore_version_is_rejected_for_future_or_current_version() {
        let (index, _id) = build_index_with(1, 2, 3, 16, 16);
        let access_map = AccessMap::new();
        let mut modifier = build_modifier(&index, &access_map).unwrap();
        let v = modifier.save_version().unwrap();
        assert!(modifier.restore_version(v).is_err());
        assert!(modifier.restore_version(v + 1).is_err());
    }

    #[test]
    fn entries_with_no_sentinel_are_skipped_not_fatal() {
        let (index, id) = build_index_with(1, 2, 3, 16, 16);
        let mut access_map = AccessMap::new();
        access_map.insert(
            (id.app, id.id),
            vec![DeclaredAccess {
                offset: 4,
                size: 8,
                access_type: AccessType::Writable,
                request_id: 0,
                new_size: None,
            }],
        );
        let mut modifier = build_modifier(&index, &access_map).unwrap();
        modifier.load_context(id.app);
        assert!(!modifier.has_context(), "no sentinel means the chunk never entered the modifier");
    }
}
