// Path: crates/vmcore-heap/src/pod.rs
//! The `Pod` marker (spec.md §9 design note "typed blind memcpy"): the
//! source casts raw bytes to arbitrary POD types. Here, typed reads/writes
//! go through explicit little-endian encode/decode for a closed set of
//! fixed-width integer types, bounded at compile time by `SIZE <= 8`.

/// A plain-old-data integer type that `HeapModifier::read`/`write`/
/// `add_int` can move to and from chunk bytes. Implemented only for
/// fixed-width integers up to 8 bytes wide.
pub trait Pod: Sized + Copy {
    const SIZE: usize;

    fn to_le_vec(self) -> Vec<u8>;
    fn from_le_slice(bytes: &[u8]) -> Self;

    /// Wrapping add, used by `add_int` (spec.md §4.5).
    fn wrapping_add(self, other: Self) -> Self;

    fn zero() -> Self;
}

macro_rules! impl_pod {
    ($ty:ty) => {
        impl Pod for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            fn to_le_vec(self) -> Vec<u8> {
                self.to_le_bytes().to_vec()
            }

            fn from_le_slice(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                <$ty>::from_le_bytes(buf)
            }

            fn wrapping_add(self, other: Self) -> Self {
                self.wrapping_add(other)
            }

            fn zero() -> Self {
                0
            }
        }
    };
}

impl_pod!(u8);
impl_pod!(u16);
impl_pod!(u32);
impl_pod!(u64);
impl_pod!(i8);
impl_pod!(i16);
impl_pod!(i32);
impl_pod!(i64);

const _: () = assert!(std::mem::size_of::<u64>() <= 8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_width() {
        assert_eq!(u8::from_le_slice(&42u8.to_le_vec()), 42u8);
        assert_eq!(u32::from_le_slice(&123_456u32.to_le_vec()), 123_456u32);
        assert_eq!(i64::from_le_slice(&(-9000i64).to_le_vec()), -9000i64);
    }

    #[test]
    fn wrapping_add_matches_native() {
        assert_eq!(Pod::wrapping_add(250u8, 10u8), 250u8.wrapping_add(10u8));
    }
}
