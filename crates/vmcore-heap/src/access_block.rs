// Path: crates/vmcore-heap/src/access_block.rs
//! The live `AccessBlock` (spec.md §3, §4.5): a request-local view of `size`
//! bytes at a chunk offset, backed by a stack of `(version, bytes)` entries
//! atop the underlying chunk.

use crate::pod::Pod;
use std::sync::Arc;
use thiserror::Error;
use vmcore_storage::{Chunk, ChunkError};
use vmcore_types::AccessType;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessBlockError {
    #[error("access block does not exist")]
    NotDefined,
    #[error("access block is check_only and cannot be read")]
    CheckOnly,
    #[error("access block is not writable")]
    NotWritable,
    #[error("access block is not int_additive")]
    NotIntAdditive,
    #[error("typed access width {requested} does not match the declared block width {declared}")]
    WidthMismatch { requested: usize, declared: usize },
    #[error("chunk error: {0}")]
    Chunk(#[from] ChunkError),
}

/// One versioned snapshot of an access block's content.
#[derive(Debug, Clone)]
struct Version {
    number: u32,
    bytes: Vec<u8>,
}

/// A request-local view of `size` bytes at `offset` in `chunk`, with access
/// type `access_type` and a LIFO version stack (spec.md §3).
#[derive(Debug, Clone)]
pub struct AccessBlock {
    pub offset: usize,
    pub size: usize,
    pub access_type: AccessType,
    chunk: Arc<Chunk>,
    versions: Vec<Version>,
}

impl AccessBlock {
    pub fn new(offset: usize, size: usize, access_type: AccessType, chunk: Arc<Chunk>) -> Self {
        Self {
            offset,
            size,
            access_type,
            chunk,
            versions: Vec::new(),
        }
    }

    fn heap_bytes(&self) -> Result<Vec<u8>, AccessBlockError> {
        Ok(self.chunk.read_at(self.offset, self.size)?)
    }

    /// The bytes this block currently exposes: the top of its version stack,
    /// or the live heap bytes if no version has been written yet.
    fn current_bytes(&self) -> Result<Vec<u8>, AccessBlockError> {
        match self.versions.last() {
            Some(v) => Ok(v.bytes.clone()),
            None => self.heap_bytes(),
        }
    }

    /// `read<T>` (spec.md §4.5): requires the block not be `check_only`.
    pub fn read<T: Pod>(&self) -> Result<T, AccessBlockError> {
        if self.access_type == AccessType::CheckOnly {
            return Err(AccessBlockError::CheckOnly);
        }
        if T::SIZE != self.size {
            return Err(AccessBlockError::WidthMismatch {
                requested: T::SIZE,
                declared: self.size,
            });
        }
        let bytes = self.current_bytes()?;
        Ok(T::from_le_slice(&bytes))
    }

    /// `write<T>` (spec.md §4.5): requires `writable`; materializes a new
    /// version stacked at `current_version` if the top is older, seeding it
    /// from the previous top (or the heap if the stack is empty).
    pub fn write<T: Pod>(&mut self, value: T, current_version: u32) -> Result<(), AccessBlockError> {
        if self.access_type != AccessType::Writable {
            return Err(AccessBlockError::NotWritable);
        }
        if T::SIZE != self.size {
            return Err(AccessBlockError::WidthMismatch {
                requested: T::SIZE,
                declared: self.size,
            });
        }
        self.push_version_if_stale(current_version)?;
        let top = self.versions.last_mut().expect("just ensured a top version exists");
        top.bytes = value.to_le_vec();
        Ok(())
    }

    /// `add_int<T>` (spec.md §4.5): requires `int_additive`; the prior value
    /// (top of stack, or zero if the stack is empty) is incremented and the
    /// top replaced.
    pub fn add_int<T: Pod>(&mut self, delta: T, current_version: u32) -> Result<(), AccessBlockError> {
        if self.access_type != AccessType::IntAdditive {
            return Err(AccessBlockError::NotIntAdditive);
        }
        if T::SIZE != self.size {
            return Err(AccessBlockError::WidthMismatch {
                requested: T::SIZE,
                declared: self.size,
            });
        }
        let prior = match self.versions.last() {
            Some(v) => T::from_le_slice(&v.bytes),
            None => T::zero(),
        };
        let updated = prior.wrapping_add(delta);
        self.push_version_if_stale(current_version)?;
        let top = self.versions.last_mut().expect("just ensured a top version exists");
        top.bytes = updated.to_le_vec();
        Ok(())
    }

    /// Raw byte write, used by variable-length-uint bridging (spec.md §4.5:
    /// "variable-length uint reads/writes bridge the block bytes through a
    /// specified PrefixTrie").
    pub fn write_raw(&mut self, bytes: &[u8], current_version: u32) -> Result<(), AccessBlockError> {
        if self.access_type != AccessType::Writable {
            return Err(AccessBlockError::NotWritable);
        }
        self.push_version_if_stale(current_version)?;
        let top = self.versions.last_mut().expect("just ensured a top version exists");
        top.bytes = bytes.to_vec();
        Ok(())
    }

    pub fn read_raw(&self) -> Result<Vec<u8>, AccessBlockError> {
        if self.access_type == AccessType::CheckOnly {
            return Err(AccessBlockError::CheckOnly);
        }
        self.current_bytes()
    }

    fn push_version_if_stale(&mut self, current_version: u32) -> Result<(), AccessBlockError> {
        let needs_push = match self.versions.last() {
            Some(top) => top.number < current_version,
            None => true,
        };
        if needs_push {
            let seed = self.current_bytes()?;
            self.versions.push(Version {
                number: current_version,
                bytes: seed,
            });
        }
        Ok(())
    }

    /// Drops every version with number `> v` (spec.md §4.5 `restore_version`).
    pub fn restore_version(&mut self, v: u32) {
        self.versions.retain(|ver| ver.number <= v);
    }

    /// Top-of-stack version number, if any version has been written.
    pub fn current_version(&self) -> Option<u32> {
        self.versions.last().map(|v| v.number)
    }

    pub fn has_version(&self, v: u32) -> bool {
        self.versions.iter().any(|ver| ver.number == v)
    }

    /// Commits the top-of-stack content back to the underlying chunk
    /// (spec.md §4.5 `write_to_heap`). `commit_len` is the number of bytes to
    /// actually write (`min(blockSize, remainingToEOF)` for writable blocks).
    pub fn write_to_heap(&self, commit_len: usize) -> Result<(), AccessBlockError> {
        let Some(top) = self.versions.last() else {
            return Ok(());
        };
        match self.access_type {
            AccessType::Writable => {
                let len = commit_len.min(top.bytes.len());
                if len > 0 {
                    self.chunk.write_at(self.offset, &top.bytes[..len])?;
                }
            }
            AccessType::IntAdditive => {
                let delta = u64::from_le_bytes({
                    let mut buf = [0u8; 8];
                    let n = top.bytes.len().min(8);
                    buf[..n].copy_from_slice(&top.bytes[..n]);
                    buf
                });
                self.chunk.add_le_at(self.offset, self.size, delta)?;
            }
            AccessType::ReadOnly | AccessType::CheckOnly => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(access_type: AccessType, size: usize) -> AccessBlock {
        let chunk = Arc::new(Chunk::new(16, true).unwrap());
        AccessBlock::new(0, size, access_type, chunk)
    }

    #[test]
    fn write_then_read_round_trips_without_touching_heap() {
        let mut b = block(AccessType::Writable, 8);
        b.write::<u64>(42, 1).unwrap();
        assert_eq!(b.read::<u64>().unwrap(), 42u64);
        assert_eq!(b.chunk.read_at(0, 8).unwrap(), vec![0u8; 8]);
    }

    #[test]
    fn restore_version_drops_newer_versions() {
        let mut b = block(AccessType::Writable, 8);
        let v1 = 1;
        b.write::<u64>(10, v1).unwrap();
        let v2 = 2;
        b.write::<u64>(20, v2).unwrap();
        assert_eq!(b.read::<u64>().unwrap(), 20u64);
        b.restore_version(v1);
        assert_eq!(b.read::<u64>().unwrap(), 10u64);
    }

    #[test]
    fn additive_accumulates_across_versions() {
        let mut b = block(AccessType::IntAdditive, 8);
        b.add_int::<u64>(5, 1).unwrap();
        b.add_int::<u64>(7, 2).unwrap();
        assert_eq!(b.read::<u64>().unwrap(), 12u64);
    }

    #[test]
    fn check_only_rejects_reads_and_writes() {
        let b = block(AccessType::CheckOnly, 8);
        assert_eq!(b.read::<u64>(), Err(AccessBlockError::CheckOnly));
    }

    #[test]
    fn write_to_heap_commits_writable_block() {
        let mut b = block(AccessType::Writable, 8);
        b.write::<u64>(0x0102030405060708, 1).unwrap();
        b.write_to_heap(8).unwrap();
        let bytes = b.chunk.read_at(0, 8).unwrap();
        assert_eq!(bytes, 0x0102030405060708u64.to_le_bytes());
    }

    #[test]
    fn write_to_heap_commits_additive_block_via_add_le_at() {
        let chunk = Arc::new(Chunk::new(16, true).unwrap());
        chunk.write_at(0, &1234u64.to_le_bytes()).unwrap();
        let mut b = AccessBlock::new(0, 8, AccessType::IntAdditive, chunk.clone());
        b.add_int::<u64>(556_677, 1).unwrap();
        b.write_to_heap(8).unwrap();
        let bytes = chunk.read_at(0, 8).unwrap();
        assert_eq!(u64::from_le_bytes(bytes.try_into().unwrap()), 557_911);
    }
}
