// Path: crates/vmcore-types/src/ident.rs
//! Identifiers (spec.md §3): `LongID`, `LongLongID`, `FullID`, and
//! `VarLenFullID`, plus the three process-wide identifier tries (app,
//! account, local) used to pack a `FullID` into its canonical variable-length
//! byte form.

use crate::prefix_trie::{PrefixTrie, PrefixTrieError};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 64-bit opaque tag (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LongID(pub u64);

impl LongID {
    pub const ZERO: LongID = LongID(0);
}

impl fmt::Display for LongID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for LongID {
    fn from(v: u64) -> Self {
        LongID(v)
    }
}

/// An ordered pair of `LongID`s identifying a chunk within an application
/// (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LongLongID {
    pub account: LongID,
    pub local: LongID,
}

impl LongLongID {
    pub fn new(account: LongID, local: LongID) -> Self {
        Self { account, local }
    }
}

/// `(app, LongLongID)`: globally identifies a chunk (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FullID {
    pub app: LongID,
    pub id: LongLongID,
}

impl FullID {
    pub fn new(app: LongID, account: LongID, local: LongID) -> Self {
        Self {
            app,
            id: LongLongID::new(account, local),
        }
    }
}

impl fmt::Display for FullID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.app, self.id.account, self.id.local)
    }
}

/// Builds a growth-reserving trie of the given `height`: every non-final
/// level reserves the top 16 values of its byte width as a "continue"
/// signal, so identifiers that fit in fewer bytes are encoded in fewer
/// bytes. Shared by the three process-wide identifier tries below.
fn reserved_growth_trie(height: usize) -> PrefixTrie {
    let mut levels = vec![0u64; height];
    for (i, slot) in levels.iter_mut().enumerate() {
        *slot = if i + 1 == height {
            u64::MAX
        } else {
            256u64.pow((i + 1) as u32) - 16
        };
    }
    PrefixTrie::new(&levels).expect("built-in identifier trie boundaries must be monotonic")
}

/// The process-wide trie for application identifiers.
pub static APP_TRIE: Lazy<PrefixTrie> = Lazy::new(|| reserved_growth_trie(4));
/// The process-wide trie for account identifiers.
pub static ACCOUNT_TRIE: Lazy<PrefixTrie> = Lazy::new(|| reserved_growth_trie(8));
/// The process-wide trie for local (per-account) identifiers.
pub static LOCAL_TRIE: Lazy<PrefixTrie> = Lazy::new(|| reserved_growth_trie(8));
/// The variable-length-uint trie used when packing chunk deltas (spec.md
/// §6.4); three bytes comfortably cover offsets/sizes bounded by the 64 KiB
/// chunk capacity constant.
pub static VARINT_TRIE: Lazy<PrefixTrie> = Lazy::new(|| reserved_growth_trie(3));

/// A `FullID` packed into its canonical variable-length prefix-coded byte
/// string, via the three identifier tries (spec.md §3). Hashed and compared
/// by this canonical byte form, which is exactly what makes it suitable for
/// packing many IDs densely (e.g. into page deltas).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarLenFullID(Vec<u8>);

impl VarLenFullID {
    pub fn encode(id: &FullID) -> Result<Self, PrefixTrieError> {
        let mut bytes = Vec::with_capacity(3 * 4);
        for (trie, value) in [
            (&*APP_TRIE, id.app.0),
            (&*ACCOUNT_TRIE, id.id.account.0),
            (&*LOCAL_TRIE, id.id.local.0),
        ] {
            let (code, len) = trie.encode_var_uint(value)?;
            bytes.extend_from_slice(&PrefixTrie::to_be_bytes(code, len));
        }
        Ok(Self(bytes))
    }

    pub fn decode(&self) -> Result<FullID, PrefixTrieError> {
        let mut offset = 0usize;
        let (app, n) = APP_TRIE.decode_var_uint(&self.0[offset..], APP_TRIE.height())?;
        offset += n;
        let (account, n) = ACCOUNT_TRIE.decode_var_uint(&self.0[offset..], ACCOUNT_TRIE.height())?;
        offset += n;
        let (local, n) = LOCAL_TRIE.decode_var_uint(&self.0[offset..], LOCAL_TRIE.height())?;
        offset += n;
        debug_assert_eq!(offset, self.0.len());
        Ok(FullID::new(LongID(app), LongID(account), LongID(local)))
    }

    /// The canonical byte form, used both as a hash key and as the on-wire
    /// representation inside page deltas (spec.md §6.4).
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn from_canonical_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_len_full_id_round_trips() {
        let id = FullID::new(LongID(7), LongID(900_000), LongID(42));
        let packed = VarLenFullID::encode(&id).unwrap();
        let unpacked = packed.decode().unwrap();
        assert_eq!(id, unpacked);
    }

    #[test]
    fn canonical_bytes_are_hash_stable() {
        let a = FullID::new(LongID(1), LongID(2), LongID(3));
        let b = FullID::new(LongID(1), LongID(2), LongID(3));
        assert_eq!(
            VarLenFullID::encode(&a).unwrap(),
            VarLenFullID::encode(&b).unwrap()
        );
    }

    #[test]
    fn different_ids_pack_to_different_bytes() {
        let a = FullID::new(LongID(1), LongID(2), LongID(3));
        let b = FullID::new(LongID(1), LongID(2), LongID(4));
        assert_ne!(
            VarLenFullID::encode(&a).unwrap().as_bytes(),
            VarLenFullID::encode(&b).unwrap().as_bytes()
        );
    }
}
