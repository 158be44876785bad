// Path: crates/vmcore-types/src/prefix_trie.rs
//! The prefix-trie codec (spec.md §4.1): an immutable lookup structure
//! parameterized by `h` ascending boundary values that defines a reversible
//! variable-length-uint encoding and a lossless decimal/hex identifier
//! parser.
//!
//! Grounded directly on `original_source/src/util/PrefixTrie.hpp`: the same
//! `trie`/`boundary`/`sum` triple-array construction, re-expressed without
//! unchecked pointer arithmetic. `T` is fixed to `u64` here (every
//! identifier role in this crate is a 64-bit `LongID`), so the trie height
//! is bounded by `8`.

use std::fmt;

const WIDTH_BYTES: usize = 8;
const MAX_HEIGHT: usize = WIDTH_BYTES;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PrefixTrieError {
    #[error("prefix trie boundaries are not monotonically ascending")]
    NonMonotonicBoundary,
    #[error("height must be in 1..={MAX_HEIGHT}, got {0}")]
    InvalidHeight(usize),
    #[error("invalid prefix code: no boundary was reached within the trie's height")]
    InvalidPrefixCode,
    #[error("value exceeds the codespace representable by this trie")]
    Overflow,
    #[error("malformed identifier literal: {0}")]
    Parse(String),
}

fn shift_for_level(level: usize) -> u32 {
    ((WIDTH_BYTES - level - 1) * 8) as u32
}

/// An immutable variable-length-uint codec over `u64`, built from `height`
/// ascending per-level boundaries.
#[derive(Debug, Clone)]
pub struct PrefixTrie {
    height: usize,
    /// `trie[i]`: the raw (i+1)-byte boundary for level `i`.
    trie: Vec<u64>,
    /// `boundary[i] = trie[i] << shift(i)`: `trie[i]` positioned at the
    /// high-order bytes of a `u64`, so it can be compared directly against
    /// a partially-accumulated MSB-first read.
    boundary: Vec<u64>,
    /// `sum[i]`: the total codespace size representable using `<= i+1`
    /// bytes.
    sum: Vec<u64>,
}

impl PrefixTrie {
    /// Builds a trie from `height` raw per-level boundary values. `levels[i]`
    /// must fit within `i+1` bytes, and the derived per-level codespace must
    /// be non-negative and ascending, or construction fails (spec.md §4.1:
    /// "malformed trie boundaries are a construction-time error").
    pub fn new(levels: &[u64]) -> Result<Self, PrefixTrieError> {
        let height = levels.len();
        if height == 0 || height > MAX_HEIGHT {
            return Err(PrefixTrieError::InvalidHeight(height));
        }

        let mut trie = vec![0u64; height];
        let mut boundary = vec![0u64; height];
        for i in 0..height {
            let shift = shift_for_level(i);
            let mask = if shift >= 64 { u64::MAX } else { !0u64 >> shift };
            trie[i] = levels[i] & mask;
            boundary[i] = trie[i] << shift;
            if i > 0 && boundary[i - 1] > boundary[i] {
                return Err(PrefixTrieError::NonMonotonicBoundary);
            }
        }

        let mut sum = vec![0u64; height];
        sum[0] = trie[0];
        for i in 1..height {
            let prev_scaled = trie[i - 1]
                .checked_shl(8)
                .ok_or(PrefixTrieError::NonMonotonicBoundary)?;
            let growth = trie[i]
                .checked_sub(prev_scaled)
                .ok_or(PrefixTrieError::NonMonotonicBoundary)?;
            sum[i] = sum[i - 1]
                .checked_add(growth)
                .ok_or(PrefixTrieError::NonMonotonicBoundary)?;
        }

        Ok(Self {
            height,
            trie,
            boundary,
            sum,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of distinct values this trie can encode.
    pub fn codespace(&self) -> u64 {
        self.sum[self.height - 1]
    }

    /// Walks up to `max_len` bytes of `bytes`, MSB-first, stopping at the
    /// first level whose accumulated value is below that level's boundary.
    /// Returns the accumulated (top-aligned) value and the number of bytes
    /// consumed.
    pub fn read_prefix_code(&self, bytes: &[u8], max_len: usize) -> Result<(u64, usize), PrefixTrieError> {
        let limit = max_len.min(self.height).min(bytes.len());
        let mut id: u64 = 0;
        for i in 0..limit {
            id |= (bytes[i] as u64) << shift_for_level(i);
            if id < self.boundary[i] {
                return Ok((id, i + 1));
            }
        }
        Err(PrefixTrieError::InvalidPrefixCode)
    }

    /// Compares two prefix codes byte-by-byte while parsing them, returning
    /// whether they are equal and, if so, the shared length consumed.
    pub fn equals(&self, a: &[u8], b: &[u8], max_len: usize) -> Result<(bool, usize), PrefixTrieError> {
        let limit = max_len.min(self.height).min(a.len()).min(b.len());
        let mut id: u64 = 0;
        for i in 0..limit {
            if a[i] != b[i] {
                return Ok((false, 0));
            }
            id |= (a[i] as u64) << shift_for_level(i);
            if id < self.boundary[i] {
                return Ok((true, i + 1));
            }
        }
        Err(PrefixTrieError::InvalidPrefixCode)
    }

    /// Maps `value` monotonically into a prefix code. Returns the
    /// top-aligned encoded value and its byte length; the caller extracts
    /// the big-endian bytes via [`PrefixTrie::to_be_bytes`].
    pub fn encode_var_uint(&self, value: u64) -> Result<(u64, usize), PrefixTrieError> {
        for i in 0..self.height {
            if value < self.sum[i] {
                let bound = self.trie[i];
                let offset = bound - (self.sum[i] - value);
                let code = offset << shift_for_level(i);
                return Ok((code, i + 1));
            }
        }
        Err(PrefixTrieError::Overflow)
    }

    /// The inverse of [`PrefixTrie::encode_var_uint`].
    pub fn decode_var_uint(&self, bytes: &[u8], max_len: usize) -> Result<(u64, usize), PrefixTrieError> {
        let (id, n) = self.read_prefix_code(bytes, max_len)?;
        let code = id >> shift_for_level(n - 1);
        let bound = self.trie[n - 1];
        Ok((self.sum[n - 1] + code - bound, n))
    }

    /// Writes the big-endian byte representation of a top-aligned code of
    /// length `len` (as returned by [`PrefixTrie::encode_var_uint`]).
    pub fn to_be_bytes(code: u64, len: usize) -> Vec<u8> {
        let full = code.to_be_bytes();
        full[0..len].to_vec()
    }

    /// Parses either a dot-separated-decimal (`"3.40.7"`) or a `0x`-prefixed
    /// hex literal into a canonical top-aligned identifier value.
    pub fn parse(&self, text: &str) -> Result<u64, PrefixTrieError> {
        let trimmed = text.trim();
        if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
            let raw = u64::from_str_radix(hex, 16)
                .map_err(|e| PrefixTrieError::Parse(format!("bad hex literal: {e}")))?;
            let aligned = left_align(raw);
            let bytes = aligned.to_be_bytes();
            let (id, _) = self.read_prefix_code(&bytes, self.height)?;
            return Ok(id);
        }

        let mut buf = [0u8; MAX_HEIGHT];
        let mut count = 0usize;
        for part in trimmed.split('.') {
            if count == self.height {
                return Err(PrefixTrieError::Parse("too many components".into()));
            }
            let component: u32 = part
                .parse()
                .map_err(|e| PrefixTrieError::Parse(format!("bad decimal component '{part}': {e}")))?;
            if component > 255 {
                return Err(PrefixTrieError::Parse(format!(
                    "component {component} exceeds a single byte"
                )));
            }
            buf[count] = component as u8;
            count += 1;
        }
        if count == 0 {
            return Err(PrefixTrieError::Parse("empty identifier".into()));
        }
        let (id, consumed) = self.read_prefix_code(&buf, count)?;
        if consumed != count {
            return Err(PrefixTrieError::Parse(format!(
                "identifier used {count} components but the prefix code only needs {consumed}"
            )));
        }
        Ok(id)
    }

    /// The inverse of [`PrefixTrie::parse`]'s decimal form: renders `code`
    /// as dot-separated decimal bytes.
    pub fn to_decimal_str(&self, code: u64) -> Result<String, PrefixTrieError> {
        let bytes = code.to_be_bytes();
        let mut out = String::new();
        let mut id: u64 = 0;
        for i in 0..self.height {
            id |= (bytes[i] as u64) << shift_for_level(i);
            if !out.is_empty() {
                out.push('.');
            }
            out.push_str(&bytes[i].to_string());
            if id < self.boundary[i] {
                return Ok(out);
            }
        }
        Err(PrefixTrieError::InvalidPrefixCode)
    }
}

/// Shifts a hex-parsed value left until its leading zero bytes are removed,
/// aligning it the same way a prefix-coded identifier is top-aligned.
fn left_align(value: u64) -> u64 {
    if value == 0 {
        return 0;
    }
    let leading_zero_bytes = value.leading_zeros() / 8;
    value << (leading_zero_bytes * 8)
}

impl fmt::Display for PrefixTrieError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn growth_trie(height: usize) -> PrefixTrie {
        // Reserves 16 values at the top of every non-final byte width as a
        // "continue" signal, giving genuine per-level growth; the final
        // level takes the remainder of the width unreserved.
        let mut levels = vec![0u64; height];
        for i in 0..height {
            if i + 1 == height {
                levels[i] = u64::MAX;
            } else {
                let width = 256u64.pow((i + 1) as u32);
                levels[i] = width - 16;
            }
        }
        PrefixTrie::new(&levels).expect("growth trie must be well-formed")
    }

    #[test]
    fn round_trip_across_every_level() {
        let trie = growth_trie(4);
        for value in [0u64, 10, 239, 240, 4000, 4334, 4335, 100_000, 16_000_000] {
            if value >= trie.codespace() {
                continue;
            }
            let (code, len) = trie.encode_var_uint(value).expect("encodable");
            let bytes = PrefixTrie::to_be_bytes(code, len);
            let (decoded, dlen) = trie.decode_var_uint(&bytes, len).expect("decodable");
            assert_eq!(dlen, len);
            assert_eq!(decoded, value, "round trip failed for {value}");
        }
    }

    #[test]
    fn length_grows_monotonically_with_value() {
        let trie = growth_trie(4);
        let (_, len_small) = trie.encode_var_uint(5).unwrap();
        let (_, len_mid) = trie.encode_var_uint(1000).unwrap();
        let (_, len_big) = trie.encode_var_uint(10_000_000).unwrap();
        assert!(len_small <= len_mid);
        assert!(len_mid <= len_big);
    }

    #[test]
    fn overflow_beyond_codespace() {
        let trie = PrefixTrie::new(&[10]).unwrap();
        assert_eq!(trie.encode_var_uint(10), Err(PrefixTrieError::Overflow));
        assert_eq!(trie.encode_var_uint(9).unwrap().1, 1);
    }

    #[test]
    fn non_monotonic_boundaries_rejected() {
        // Level 1 must be >= level 0 << 8; 100 << 8 == 25600, so 1 is invalid.
        let err = PrefixTrie::new(&[100, 1]).unwrap_err();
        assert_eq!(err, PrefixTrieError::NonMonotonicBoundary);
    }

    #[test]
    fn decimal_and_hex_parse_agree() {
        let trie = growth_trie(2);
        let (code, len) = trie.encode_var_uint(10).unwrap();
        let dotted = trie.to_decimal_str(code).unwrap();
        let via_decimal = trie.parse(&dotted).unwrap();
        assert_eq!(via_decimal, code);

        let bytes = PrefixTrie::to_be_bytes(code, len);
        let hex_literal = format!("0x{}", hex::encode(&bytes));
        let via_hex = trie.parse(&hex_literal).unwrap();
        assert_eq!(via_hex, code);
    }

    #[test]
    fn too_many_decimal_components_is_an_error() {
        let trie = growth_trie(2);
        assert!(trie.parse("1.2.3").is_err());
    }
}
