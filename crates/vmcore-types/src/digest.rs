// Path: crates/vmcore-types/src/digest.rs
//! The 32-byte digest used for chunk digests, page digests, request digests,
//! and the block-wide response-list digest. Fixed to SHA3-256 (see
//! SPEC_FULL.md §3, resolving spec.md §9 Open Question (c)).

use sha3::{Digest as _, Sha3_256};
use std::fmt;

/// A 32-byte cryptographic digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 32]);

impl Digest {
    pub const ZERO: Digest = Digest([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Computes the digest of a single byte slice.
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(data);
        hasher.finish()
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", hex::encode(self.0))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// An incremental SHA3-256 hasher. Used to aggregate several pieces of
/// data (e.g. per-chunk digests for a page, or per-response digests for a
/// block) into one final digest without allocating an intermediate buffer.
#[derive(Default)]
pub struct Hasher(Sha3_256);

impl Hasher {
    pub fn new() -> Self {
        Self(Sha3_256::new())
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }

    pub fn finish(self) -> Digest {
        let out = self.0.finalize();
        let mut buf = [0u8; 32];
        buf.copy_from_slice(&out);
        Digest(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        let a = Digest::of(b"hello world");
        let b = Digest::of(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn digest_display_is_lowercase_hex() {
        let d = Digest::of(b"x");
        let s = format!("{d}");
        assert_eq!(s.len(), 64);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
    }

    #[test]
    fn incremental_hasher_matches_concatenation() {
        let mut h = Hasher::new();
        h.update(b"foo");
        h.update(b"bar");
        let incremental = h.finish();
        let concatenated = Digest::of(b"foobar");
        assert_eq!(incremental, concatenated);
    }
}
