// Path: crates/vmcore-storage/src/chunk.rs
//! The `Chunk`: a growable byte buffer bounded by the protocol's 64 KiB
//! capacity constant (spec.md §4.2).

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use thiserror::Error;
use vmcore_types::digest::Hasher;
use vmcore_types::Digest;

/// The protocol-wide maximum chunk capacity (spec.md §3).
pub const CHUNK_CAPACITY_MAX: usize = 64 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("requested capacity {0} exceeds the {CHUNK_CAPACITY_MAX}-byte protocol maximum")]
    CapacityTooLarge(usize),
    #[error("offset/size ({offset}, {size}) is out of bounds for a chunk of capacity {capacity}")]
    OutOfBounds {
        offset: usize,
        size: usize,
        capacity: usize,
    },
    #[error("chunk is not writable")]
    NotWritable,
    #[error("delta digest mismatch: chunk reverted to its pre-delta state")]
    InvalidDelta,
}

/// A growable byte buffer with a writable flag, a size readable
/// concurrently via an atomic counter, and bytes guarded by an exclusive
/// content mutex used only by size-changing and delta-applying operations
/// (spec.md §3, §4.2).
#[derive(Debug)]
pub struct Chunk {
    capacity: usize,
    writable: AtomicBool,
    size: AtomicUsize,
    /// Always `capacity` bytes long; only `[0, size)` is logically valid.
    /// Bytes outside that range are guaranteed zero at session boundaries
    /// (the zero-fill invariant of spec.md §3).
    bytes: RwLock<Vec<u8>>,
}

impl Chunk {
    pub fn new(capacity: usize, writable: bool) -> Result<Self, ChunkError> {
        if capacity > CHUNK_CAPACITY_MAX {
            return Err(ChunkError::CapacityTooLarge(capacity));
        }
        Ok(Self {
            capacity,
            writable: AtomicBool::new(writable),
            size: AtomicUsize::new(0),
            bytes: RwLock::new(vec![0u8; capacity]),
        })
    }

    /// An empty, zero-capacity chunk. Infallible: zero never exceeds the
    /// capacity bound, used for migration placeholders.
    pub fn empty(writable: bool) -> Self {
        Self {
            capacity: 0,
            writable: AtomicBool::new(writable),
            size: AtomicUsize::new(0),
            bytes: RwLock::new(Vec::new()),
        }
    }

    pub fn with_initial_bytes(capacity: usize, initial: &[u8], writable: bool) -> Result<Self, ChunkError> {
        let chunk = Self::new(capacity, writable)?;
        {
            let mut buf = chunk.bytes.write();
            let n = initial.len().min(capacity);
            buf[..n].copy_from_slice(&initial[..n]);
        }
        chunk.size.store(initial.len().min(capacity), Ordering::Release);
        Ok(chunk)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    pub fn is_writable(&self) -> bool {
        self.writable.load(Ordering::Acquire)
    }

    pub fn set_writable(&self, flag: bool) {
        self.writable.store(flag, Ordering::Release);
    }

    /// Sets the chunk's size, zeroing bytes `[n, oldSize)` when shrinking
    /// (spec.md §4.2). Requires `n <= capacity`.
    pub fn set_size(&self, n: usize) -> Result<(), ChunkError> {
        if n > self.capacity {
            return Err(ChunkError::OutOfBounds {
                offset: n,
                size: 0,
                capacity: self.capacity,
            });
        }
        let mut buf = self.bytes.write();
        let old = self.size.load(Ordering::Acquire);
        if n < old {
            buf[n..old].fill(0);
        }
        self.size.store(n, Ordering::Release);
        Ok(())
    }

    /// Pre-block allocation; not called mid-execution (spec.md §4.2). The
    /// buffer is already allocated to `capacity` at construction time, so
    /// this only validates the request fits.
    pub fn reserve(&self, n: usize) -> Result<(), ChunkError> {
        if n > self.capacity {
            return Err(ChunkError::CapacityTooLarge(n));
        }
        Ok(())
    }

    /// Post-block compaction. Idempotent.
    pub fn shrink(&self) {
        self.bytes.write().shrink_to_fit();
    }

    /// Bounds-checked read of `size` bytes starting at `offset`.
    pub fn read_at(&self, offset: usize, size: usize) -> Result<Vec<u8>, ChunkError> {
        self.check_bounds(offset, size)?;
        let buf = self.bytes.read();
        Ok(buf[offset..offset + size].to_vec())
    }

    /// Bounds-checked write; requires the chunk be writable.
    pub fn write_at(&self, offset: usize, data: &[u8]) -> Result<(), ChunkError> {
        if !self.is_writable() {
            return Err(ChunkError::NotWritable);
        }
        self.check_bounds(offset, data.len())?;
        let mut buf = self.bytes.write();
        buf[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// XORs `size` bytes of `xor_bytes` into the chunk at `offset`. Used
    /// both to apply and, on digest mismatch, to revert a delta (XOR is
    /// self-inverse; spec.md §4.2).
    pub fn xor_at(&self, offset: usize, xor_bytes: &[u8]) -> Result<(), ChunkError> {
        self.check_bounds(offset, xor_bytes.len())?;
        let mut buf = self.bytes.write();
        for (i, b) in xor_bytes.iter().enumerate() {
            buf[offset + i] ^= b;
        }
        Ok(())
    }

    /// Reads the `width` (≤ 8) bytes at `offset` as a little-endian `u64`,
    /// wrapping-adds `delta`, and writes the result back — all under one
    /// acquisition of the content mutex, so concurrent additive commits from
    /// distinct requests never interleave a read with another's write
    /// (spec.md §4.5 commit, §5 shared resources). `width < 8` truncates the
    /// result to that many low-order bytes, matching a narrower integer
    /// width.
    pub fn add_le_at(&self, offset: usize, width: usize, delta: u64) -> Result<(), ChunkError> {
        self.check_bounds(offset, width)?;
        if width == 0 || width > 8 {
            return Err(ChunkError::OutOfBounds {
                offset,
                size: width,
                capacity: self.capacity,
            });
        }
        let mut buf = self.bytes.write();
        let mut raw = [0u8; 8];
        raw[..width].copy_from_slice(&buf[offset..offset + width]);
        let current = u64::from_le_bytes(raw);
        let updated = current.wrapping_add(delta).to_le_bytes();
        buf[offset..offset + width].copy_from_slice(&updated[..width]);
        Ok(())
    }

    fn check_bounds(&self, offset: usize, size: usize) -> Result<(), ChunkError> {
        let end = offset.checked_add(size).ok_or(ChunkError::OutOfBounds {
            offset,
            size,
            capacity: self.capacity,
        })?;
        if end > self.capacity {
            return Err(ChunkError::OutOfBounds {
                offset,
                size,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// 32-byte digest over `(size, bytes[0..size])` (spec.md §4.2). Excludes
    /// the zero-filled tail so the zero-fill invariant does not perturb it.
    pub fn calculate_digest(&self) -> Digest {
        let buf = self.bytes.read();
        let size = self.size.load(Ordering::Acquire);
        let mut hasher = Hasher::new();
        hasher.update(&(size as u64).to_be_bytes());
        hasher.update(&buf[..size]);
        hasher.finish()
    }

    /// Applies a parsed per-chunk delta (spec.md §4.2, §6.4): resolves the
    /// wire's `chunkSize-xor` field against the chunk's size *before* this
    /// delta (`examples/original_source/src/heap/Chunk.cpp`'s
    /// `applyDeltaReversible`: `chunkSize ^ readVarSize(...)`), XORs every
    /// op in order, then sets the resolved size, then verifies
    /// `expected_digest`. On mismatch, reapplies the same ops (XOR
    /// self-inverse) and restores the old size before signalling
    /// `InvalidDelta`.
    pub fn apply_delta(&self, expected_digest: Digest, delta: &crate::delta::ChunkDelta) -> Result<(), ChunkError> {
        let old_size = self.size();
        let new_size = old_size ^ delta.size_xor;
        self.apply_ops(delta)?;
        self.set_size(new_size)?;

        if self.calculate_digest() == expected_digest {
            return Ok(());
        }

        // Revert: XOR is self-inverse, so reapplying the same ops undoes
        // them exactly, then restore the original size and shrink.
        self.apply_ops(delta)?;
        self.set_size(old_size)?;
        self.shrink();
        Err(ChunkError::InvalidDelta)
    }

    fn apply_ops(&self, delta: &crate::delta::ChunkDelta) -> Result<(), ChunkError> {
        for op in &delta.ops {
            self.xor_at(op.offset, &op.xor_bytes)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{ChunkDelta, DeltaOp};

    #[test]
    fn set_size_zero_fills_shrunk_tail() {
        let chunk = Chunk::new(16, true).unwrap();
        chunk.write_at(0, &[1, 2, 3, 4]).unwrap();
        chunk.set_size(4).unwrap();
        chunk.set_size(2).unwrap();
        chunk.set_size(4).unwrap();
        let bytes = chunk.read_at(0, 4).unwrap();
        assert_eq!(bytes, vec![1, 2, 0, 0]);
    }

    #[test]
    fn readonly_chunk_rejects_writes() {
        let chunk = Chunk::new(8, false).unwrap();
        assert_eq!(chunk.write_at(0, &[1]), Err(ChunkError::NotWritable));
    }

    #[test]
    fn out_of_bounds_access_is_rejected() {
        let chunk = Chunk::new(8, true).unwrap();
        assert!(chunk.write_at(7, &[1, 2]).is_err());
    }

    #[test]
    fn delta_involution_on_digest_mismatch() {
        let chunk = Chunk::new(8, true).unwrap();
        chunk.write_at(0, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let before = chunk.read_at(0, 8).unwrap();

        let delta = ChunkDelta {
            size_xor: 8,
            ops: vec![DeltaOp {
                offset: 2,
                xor_bytes: vec![0xFF, 0xFF],
            }],
        };
        let wrong_digest = Digest::of(b"not the real digest");
        let result = chunk.apply_delta(wrong_digest, &delta);
        assert_eq!(result, Err(ChunkError::InvalidDelta));

        let after = chunk.read_at(0, 8).unwrap();
        assert_eq!(before, after, "chunk must be bit-exactly restored");
    }

    #[test]
    fn add_le_at_wraps_within_the_declared_width() {
        let chunk = Chunk::new(8, true).unwrap();
        chunk.write_at(0, &1234u64.to_le_bytes()).unwrap();
        chunk.add_le_at(0, 8, 556_677).unwrap();
        let bytes = chunk.read_at(0, 8).unwrap();
        assert_eq!(u64::from_le_bytes(bytes.try_into().unwrap()), 557_911);
    }

    #[test]
    fn delta_applies_cleanly_when_digest_matches() {
        let chunk = Chunk::new(8, true).unwrap();
        chunk.write_at(0, &[0, 0, 0, 0]).unwrap();

        let delta = ChunkDelta {
            size_xor: 4,
            ops: vec![DeltaOp {
                offset: 0,
                xor_bytes: vec![1, 2, 3, 4],
            }],
        };
        let mut expected = chunk.read_at(0, 4).unwrap();
        for (b, x) in expected.iter_mut().zip(&delta.ops[0].xor_bytes) {
            *b ^= x;
        }
        let expected_digest = {
            let mut hasher = vmcore_types::digest::Hasher::new();
            hasher.update(&(4u64).to_be_bytes());
            hasher.update(&expected);
            hasher.finish()
        };

        chunk.apply_delta(expected_digest, &delta).unwrap();
        assert_eq!(chunk.read_at(0, 4).unwrap(), expected);
    }

    #[test]
    fn delta_size_field_is_xored_against_the_pre_delta_size() {
        let chunk = Chunk::new(16, true).unwrap();
        chunk.set_size(4).unwrap();
        assert_eq!(chunk.size(), 4);

        // Growing from 4 to 10 bytes: the wire field is `4 ^ 10`, not `10`.
        let delta = ChunkDelta {
            size_xor: 4 ^ 10,
            ops: vec![],
        };
        let expected_digest = {
            let buf = chunk.read_at(0, 10).unwrap();
            let mut hasher = vmcore_types::digest::Hasher::new();
            hasher.update(&(10u64).to_be_bytes());
            hasher.update(&buf);
            hasher.finish()
        };
        chunk.apply_delta(expected_digest, &delta).unwrap();
        assert_eq!(chunk.size(), 10);
    }
}
