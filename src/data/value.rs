//! Element codec for attribute arrays.
//!
//! Every type stored in a [`ChunkArray`](crate::data::chunk_array::ChunkArray)
//! implements [`AttributeValue`]: a stable type name used by the container's
//! save format, and a little-endian binary encoding through [`bytes`].

use std::fmt::Debug;

use bytes::{Buf, BufMut};

/// A value that can live in an attribute array.
pub trait AttributeValue: Clone + Default + Debug + Send + Sync + 'static {
    /// Name written in saved containers and looked up in the registry.
    const TYPE_NAME: &'static str;

    /// Append the little-endian encoding of `self` to `buf`.
    fn encode<B: BufMut>(&self, buf: &mut B);

    /// Decode one value, or `None` if `buf` is exhausted.
    fn decode<B: Buf>(buf: &mut B) -> Option<Self>;
}

macro_rules! impl_numeric_value {
    ($($t:ty => $name:literal, $put:ident, $get:ident);* $(;)?) => {
        $(
            impl AttributeValue for $t {
                const TYPE_NAME: &'static str = $name;

                #[inline]
                fn encode<B: BufMut>(&self, buf: &mut B) {
                    buf.$put(*self);
                }

                #[inline]
                fn decode<B: Buf>(buf: &mut B) -> Option<Self> {
                    (buf.remaining() >= std::mem::size_of::<$t>()).then(|| buf.$get())
                }
            }
        )*
    };
}

impl_numeric_value! {
    u8 => "u8", put_u8, get_u8;
    i8 => "i8", put_i8, get_i8;
    u16 => "u16", put_u16_le, get_u16_le;
    i16 => "i16", put_i16_le, get_i16_le;
    u32 => "u32", put_u32_le, get_u32_le;
    i32 => "i32", put_i32_le, get_i32_le;
    u64 => "u64", put_u64_le, get_u64_le;
    i64 => "i64", put_i64_le, get_i64_le;
    f32 => "f32", put_f32_le, get_f32_le;
    f64 => "f64", put_f64_le, get_f64_le;
}

impl AttributeValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(u8::from(*self));
    }

    fn decode<B: Buf>(buf: &mut B) -> Option<Self> {
        (buf.remaining() >= 1).then(|| buf.get_u8() != 0)
    }
}

impl AttributeValue for String {
    const TYPE_NAME: &'static str = "String";

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.len() as u32);
        buf.put_slice(self.as_bytes());
    }

    fn decode<B: Buf>(buf: &mut B) -> Option<Self> {
        let len = u32::decode(buf)? as usize;
        if buf.remaining() < len {
            return None;
        }
        let mut raw = vec![0u8; len];
        buf.copy_to_slice(&mut raw);
        String::from_utf8(raw).ok()
    }
}

impl AttributeValue for Vec<u32> {
    const TYPE_NAME: &'static str = "Vec<u32>";

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.len() as u32);
        for v in self {
            buf.put_u32_le(*v);
        }
    }

    fn decode<B: Buf>(buf: &mut B) -> Option<Self> {
        let len = u32::decode(buf)? as usize;
        if buf.remaining() < len * 4 {
            return None;
        }
        Some((0..len).map(|_| buf.get_u32_le()).collect())
    }
}

macro_rules! impl_vec3_value {
    ($($t:ty => $name:literal);* $(;)?) => {
        $(
            impl AttributeValue for [$t; 3] {
                const TYPE_NAME: &'static str = $name;

                fn encode<B: BufMut>(&self, buf: &mut B) {
                    for c in self {
                        c.encode(buf);
                    }
                }

                fn decode<B: Buf>(buf: &mut B) -> Option<Self> {
                    Some([<$t>::decode(buf)?, <$t>::decode(buf)?, <$t>::decode(buf)?])
                }
            }
        )*
    };
}

impl_vec3_value! {
    f32 => "[f32;3]";
    f64 => "[f64;3]";
}
