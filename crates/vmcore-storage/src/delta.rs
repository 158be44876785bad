// Path: crates/vmcore-storage/src/delta.rs
//! The on-disk delta wire format (spec.md §6.4): transport-level, not
//! user-facing. A page delta packs zero or more id-diffs (for migrant
//! identification) followed by one chunk-delta per contained chunk, and a
//! final rolling digest.
//!
//! Offsets and sizes are packed through [`vmcore_types::ident::VARINT_TRIE`]
//! so small, common deltas (a handful of bytes at a small offset) cost only
//! one or two bytes, not a fixed-width field.

use thiserror::Error;
use vmcore_types::ident::VARINT_TRIE;
use vmcore_types::prefix_trie::PrefixTrie;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeltaCodecError {
    #[error("truncated delta: expected more bytes while decoding {0}")]
    Truncated(&'static str),
    #[error("var-uint field could not be decoded: {0}")]
    VarUint(#[from] vmcore_types::prefix_trie::PrefixTrieError),
}

/// One `(offsetDiff, blockSize, xorBytes)` operation within a chunk delta.
/// `offset` here is already the cumulative, resolved offset (the decoder
/// folds in `offsetDiff` against a running cursor; see
/// [`decode_chunk_delta`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaOp {
    pub offset: usize,
    pub xor_bytes: Vec<u8>,
}

/// A parsed per-chunk delta: `[chunkSize-xor, (offsetDiff, blockSize,
/// xorBytes)*]` (spec.md §3, §6.4). `size_xor` is carried through exactly as
/// it appears on the wire: it is not the new size itself but that size
/// XORed against the chunk's size *before* this delta is applied
/// (`examples/original_source/src/heap/Chunk.cpp`'s `applyDeltaReversible`:
/// `auto size = chunkSize ^ (int32) readVarSize(...)`). Resolving it to an
/// absolute size is the applying chunk's job, since this codec has no
/// chunk in hand to XOR against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDelta {
    pub size_xor: usize,
    pub ops: Vec<DeltaOp>,
}

fn encode_varint(value: u64, out: &mut Vec<u8>) -> Result<(), DeltaCodecError> {
    let (code, len) = VARINT_TRIE.encode_var_uint(value)?;
    out.extend_from_slice(&PrefixTrie::to_be_bytes(code, len));
    Ok(())
}

fn decode_varint(bytes: &[u8], cursor: &mut usize) -> Result<u64, DeltaCodecError> {
    let (value, len) = VARINT_TRIE.decode_var_uint(
        bytes.get(*cursor..).ok_or(DeltaCodecError::Truncated("varint"))?,
        VARINT_TRIE.height(),
    )?;
    *cursor += len;
    Ok(value)
}

/// Encodes a single chunk delta as `size, (offsetDiff, blockSize, xorBytes)*`
/// terminated implicitly by the caller's framing (the chunk-delta list in a
/// page delta is itself length-prefixed by the number of chunks, not by a
/// sentinel inside this function).
pub fn encode_chunk_delta(delta: &ChunkDelta, out: &mut Vec<u8>) -> Result<(), DeltaCodecError> {
    encode_varint(delta.size_xor as u64, out)?;
    encode_varint(delta.ops.len() as u64, out)?;
    let mut cursor = 0usize;
    for op in &delta.ops {
        let offset_diff = op.offset.saturating_sub(cursor);
        encode_varint(offset_diff as u64, out)?;
        encode_varint(op.xor_bytes.len() as u64, out)?;
        out.extend_from_slice(&op.xor_bytes);
        cursor = op.offset + op.xor_bytes.len();
    }
    Ok(())
}

pub fn decode_chunk_delta(bytes: &[u8], cursor: &mut usize) -> Result<ChunkDelta, DeltaCodecError> {
    let size_xor = decode_varint(bytes, cursor)? as usize;
    let op_count = decode_varint(bytes, cursor)? as usize;
    let mut ops = Vec::with_capacity(op_count);
    let mut running_offset = 0usize;
    for _ in 0..op_count {
        let offset_diff = decode_varint(bytes, cursor)? as usize;
        let block_size = decode_varint(bytes, cursor)? as usize;
        let offset = running_offset + offset_diff;
        let xor_bytes = bytes
            .get(*cursor..*cursor + block_size)
            .ok_or(DeltaCodecError::Truncated("xorBytes"))?
            .to_vec();
        *cursor += block_size;
        running_offset = offset + block_size;
        ops.push(DeltaOp { offset, xor_bytes });
    }
    Ok(ChunkDelta { size_xor, ops })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_delta_round_trips() {
        let delta = ChunkDelta {
            size_xor: 10,
            ops: vec![
                DeltaOp {
                    offset: 0,
                    xor_bytes: vec![1, 2, 3],
                },
                DeltaOp {
                    offset: 7,
                    xor_bytes: vec![9, 9],
                },
            ],
        };
        let mut bytes = Vec::new();
        encode_chunk_delta(&delta, &mut bytes).unwrap();
        let mut cursor = 0;
        let decoded = decode_chunk_delta(&bytes, &mut cursor).unwrap();
        assert_eq!(decoded, delta);
        assert_eq!(cursor, bytes.len());
    }

    #[test]
    fn truncated_delta_is_rejected() {
        let delta = ChunkDelta {
            size_xor: 4,
            ops: vec![DeltaOp {
                offset: 0,
                xor_bytes: vec![1, 2, 3, 4],
            }],
        };
        let mut bytes = Vec::new();
        encode_chunk_delta(&delta, &mut bytes).unwrap();
        bytes.truncate(bytes.len() - 1);
        let mut cursor = 0;
        assert!(decode_chunk_delta(&bytes, &mut cursor).is_err());
    }
}
