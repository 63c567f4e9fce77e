//! `Dart`: the atomic handle of a combinatorial map
//!
//! A dart is an index into the topology container of its map. It carries no
//! data of its own: relations (phi1, phi2, phi3) and embeddings are attribute
//! arrays indexed by it. `Dart::INVALID` (`u32::MAX`) is the sentinel for
//! "no dart".

use std::fmt;

use bytes::{Buf, BufMut};

use crate::data::value::AttributeValue;

/// Handle on one dart of a map.
///
/// # Memory layout
/// `repr(transparent)` over `u32`, so a `ChunkArray<Dart>` is laid out like
/// an array of indices.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct Dart(u32);

impl Dart {
    /// Sentinel value, never a live dart.
    pub const INVALID: Dart = Dart(u32::MAX);

    #[inline]
    pub const fn new(index: u32) -> Self {
        Dart(index)
    }

    /// Line index of this dart in the topology container.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

impl Default for Dart {
    fn default() -> Self {
        Dart::INVALID
    }
}

impl fmt::Debug for Dart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            f.debug_tuple("Dart").field(&self.0).finish()
        } else {
            f.write_str("Dart(INVALID)")
        }
    }
}

impl fmt::Display for Dart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AttributeValue for Dart {
    const TYPE_NAME: &'static str = "Dart";

    #[inline]
    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.0);
    }

    #[inline]
    fn decode<B: Buf>(buf: &mut B) -> Option<Self> {
        u32::decode(buf).map(Dart)
    }
}

#[cfg(test)]
mod layout_tests {
    use super::*;
    use static_assertions::{assert_eq_align, assert_eq_size};

    assert_eq_size!(Dart, u32);
    assert_eq_align!(Dart, u32);
}
