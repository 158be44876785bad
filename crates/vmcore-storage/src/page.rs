// Path: crates/vmcore-storage/src/page.rs
//! `Page` and `PageCache` (spec.md §4.3): the storage granule returned by
//! the page loader, and the block-lifetime map from `VarLenFullID` to
//! `Page`.

use crate::chunk::{Chunk, ChunkError};
use crate::delta::ChunkDelta;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use vmcore_types::digest::Hasher;
use vmcore_types::{Digest, VarLenFullID};

#[derive(Debug, Error)]
pub enum PageCacheError {
    #[error("chunk error: {0}")]
    Chunk(#[from] ChunkError),
    #[error("page loader error for {0}: {1}")]
    Loader(String, String),
    #[error("migration source page {0:?} not found")]
    MigrationSourceMissing(usize),
    #[error("migration destination page {0:?} not found")]
    MigrationDestMissing(usize),
    #[error("migrant index {0} out of range on source page")]
    MigrantIndexOutOfRange(usize),
    #[error("migration into a page whose native chunk already has migrants")]
    MigrationIntoPageWithMigrants,
}

/// The current block being validated; block loading/consensus itself is out
/// of scope (spec.md §1) — only the height is needed to version pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRef {
    pub height: u64,
}

/// A chunk migration entry (spec.md §4.3).
#[derive(Debug, Clone, Copy)]
pub struct MigrationInfo {
    /// `-1` (represented as `None`) moves the *native* chunk of the source
    /// page; `Some(i)` extracts migrant `i` from the source page instead.
    pub chunk_index: Option<usize>,
    pub from_index: usize,
    pub to_index: usize,
}

/// The external page loader collaborator (spec.md §6.2). Persistent page
/// storage and the PV-DB wire protocol are out of scope; this crate only
/// consumes the trait.
pub trait PageLoader: Send + Sync {
    fn set_current_block(&mut self, block: BlockRef);
    /// Issues fetches to the remote PV-DB if needed.
    fn prepare_page(&self, id: &VarLenFullID, page: &Page) -> Result<(), String>;
    /// Synchronously brings `page` from its current version up to
    /// `previous_block.height`.
    fn update_page(&self, id: &VarLenFullID, page: &mut Page) -> Result<(), String>;
}

/// One native chunk plus zero or more migrants (spec.md §3, §4.3).
#[derive(Debug, Clone)]
pub struct Page {
    pub native_id: VarLenFullID,
    pub native: Arc<Chunk>,
    pub migrants: Vec<(VarLenFullID, Arc<Chunk>)>,
    /// The block number this page's contents are valid as of.
    pub version: u64,
    pub writable: bool,
}

impl Page {
    pub fn new_empty(native_id: VarLenFullID, capacity: usize, version: u64, writable: bool) -> Result<Self, ChunkError> {
        Ok(Self {
            native_id,
            native: Arc::new(Chunk::new(capacity, writable)?),
            migrants: Vec::new(),
            version,
            writable,
        })
    }

    /// Every `(VarLenFullID, &Chunk)` pair contained in the page, native
    /// first then migrants in order — the order a combined delta and the
    /// rolling digest both iterate in.
    pub fn chunks(&self) -> impl Iterator<Item = (&VarLenFullID, &Arc<Chunk>)> {
        std::iter::once((&self.native_id, &self.native)).chain(self.migrants.iter().map(|(id, c)| (id, c)))
    }

    /// A rolling digest of every contained chunk keyed by its
    /// `VarLenFullID`, used both to validate a combined delta and to
    /// aggregate page digests (spec.md §4.3).
    pub fn calculate_digest(&self) -> Digest {
        let mut hasher = Hasher::new();
        for (id, chunk) in self.chunks() {
            hasher.update(id.as_bytes());
            hasher.update(chunk.calculate_digest().as_bytes());
        }
        hasher.finish()
    }

    /// Applies one combined delta over every chunk in the page, validated
    /// by the rolling digest (spec.md §4.3). `deltas` pairs each chunk
    /// (matched by `VarLenFullID`) with its parsed per-chunk delta. Each
    /// delta's `size_xor` is resolved against that chunk's size *before*
    /// this delta, exactly as `Chunk::apply_delta` does (spec.md §6.4;
    /// `examples/original_source/src/heap/Chunk.cpp`'s
    /// `applyDeltaReversible`) — it is not a literal absolute size.
    pub fn apply_combined_delta(
        &self,
        expected_digest: Digest,
        deltas: &[(VarLenFullID, ChunkDelta)],
    ) -> Result<(), PageCacheError> {
        let mut old_sizes = Vec::with_capacity(deltas.len());
        for (id, delta) in deltas {
            let chunk = if *id == self.native_id {
                &self.native
            } else if let Some((_, c)) = self.migrants.iter().find(|(mid, _)| mid == id) {
                c
            } else {
                old_sizes.push(None);
                continue;
            };
            let old_size = chunk.size();
            old_sizes.push(Some(old_size));
            // Individual chunks don't carry their own expected digest here;
            // the page-level rolling digest is the source of truth, so we
            // apply unconditionally and verify once, at the page level.
            for op in &delta.ops {
                chunk.xor_at(op.offset, &op.xor_bytes)?;
            }
            chunk.set_size(old_size ^ delta.size_xor)?;
        }

        if self.calculate_digest() == expected_digest {
            return Ok(());
        }

        // Revert every chunk (XOR self-inverse) and restore its pre-delta
        // size since the combined digest didn't match.
        for ((id, delta), old_size) in deltas.iter().zip(old_sizes) {
            let chunk = if *id == self.native_id {
                &self.native
            } else if let Some((_, c)) = self.migrants.iter().find(|(mid, _)| mid == id) {
                c
            } else {
                continue;
            };
            for op in &delta.ops {
                chunk.xor_at(op.offset, &op.xor_bytes)?;
            }
            if let Some(old_size) = old_size {
                chunk.set_size(old_size)?;
            }
            chunk.shrink();
        }
        Err(PageCacheError::Chunk(ChunkError::InvalidDelta))
    }
}

/// The block-lifetime map from `VarLenFullID` to `Page` (spec.md §4.3).
#[derive(Default)]
pub struct PageCache {
    pages: DashMap<VarLenFullID, Page>,
}

impl PageCache {
    pub fn new() -> Self {
        Self { pages: DashMap::new() }
    }

    pub fn get(&self, id: &VarLenFullID) -> Option<Page> {
        self.pages.get(id).map(|p| p.clone())
    }

    /// Inserts empty pages for unknown IDs (version = `block.height`), marks
    /// each with its session writable flag, brings every page up to the
    /// previous block height via `loader`, then performs chunk migrations
    /// (spec.md §4.3).
    pub fn prepare_pages(
        &self,
        block: BlockRef,
        previous_block: BlockRef,
        ids: &[VarLenFullID],
        writable: bool,
        migrations: &[MigrationInfo],
        loader: &dyn PageLoader,
        default_capacity: usize,
    ) -> Result<Vec<VarLenFullID>, PageCacheError> {
        for id in ids {
            if !self.pages.contains_key(id) {
                let page = Page::new_empty(id.clone(), default_capacity, block.height, writable)
                    .map_err(PageCacheError::Chunk)?;
                self.pages.insert(id.clone(), page);
            }
            if let Some(mut entry) = self.pages.get_mut(id) {
                entry.writable = writable;
            }
            let Some(snapshot) = self.pages.get(id).map(|p| p.clone()) else {
                warn!(?id, "page vanished between insert and prepare; skipping");
                continue;
            };
            loader
                .prepare_page(id, &snapshot)
                .map_err(|e| PageCacheError::Loader(format!("{id:?}"), e))?;
        }

        for id in ids {
            if let Some(mut entry) = self.pages.get_mut(id) {
                if entry.version < previous_block.height {
                    loader
                        .update_page(id, &mut entry)
                        .map_err(|e| PageCacheError::Loader(format!("{id:?}"), e))?;
                    entry.version = previous_block.height;
                }
            }
        }

        self.apply_migrations(ids, migrations)?;
        debug!(count = ids.len(), "prepared pages for block");
        Ok(ids.to_vec())
    }

    fn apply_migrations(&self, session_ids: &[VarLenFullID], migrations: &[MigrationInfo]) -> Result<(), PageCacheError> {
        for m in migrations {
            let from_id = session_ids
                .get(m.from_index)
                .ok_or(PageCacheError::MigrationSourceMissing(m.from_index))?
                .clone();
            let to_id = session_ids
                .get(m.to_index)
                .ok_or(PageCacheError::MigrationDestMissing(m.to_index))?
                .clone();

            let (moved_id, moved_chunk) = {
                let mut from_page = self
                    .pages
                    .get_mut(&from_id)
                    .ok_or(PageCacheError::MigrationSourceMissing(m.from_index))?;
                match m.chunk_index {
                    None => {
                        if !from_page.migrants.is_empty() {
                            return Err(PageCacheError::MigrationIntoPageWithMigrants);
                        }
                        let moved = (from_page.native_id.clone(), from_page.native.clone());
                        // The native chunk is replaced by an empty placeholder;
                        // the page itself stays addressable by its own id.
                        from_page.native = Arc::new(Chunk::new(0, from_page.writable)?);
                        moved
                    }
                    Some(idx) => {
                        if idx >= from_page.migrants.len() {
                            return Err(PageCacheError::MigrantIndexOutOfRange(idx));
                        }
                        from_page.migrants.remove(idx)
                    }
                }
            };

            let mut to_page = self
                .pages
                .get_mut(&to_id)
                .ok_or(PageCacheError::MigrationDestMissing(m.to_index))?;
            if m.chunk_index.is_none() && !to_page.migrants.is_empty() {
                warn!(?to_id, "migrating native chunk into a page that already has migrants");
            }
            to_page.migrants.push((moved_id, moved_chunk));
        }
        Ok(())
    }

    /// Finalizes the block's writes. The modified pages are already mutated
    /// in place; this only marks them committed (no-op placeholder for the
    /// persistence layer, which is out of scope).
    pub fn commit(&self, _modified_pages: &[VarLenFullID]) {}

    /// Evicts modified pages so they are re-fetched next time (spec.md
    /// §4.3).
    pub fn rollback(&self, writable_pages: &[VarLenFullID]) {
        for id in writable_pages {
            self.pages.remove(id);
        }
    }
}
