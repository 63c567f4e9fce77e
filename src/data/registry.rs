//! Type registry used to rebuild attribute arrays when a container is loaded.
//!
//! A saved container only records each attribute's type *name*; the registry
//! maps that name back to a constructor for the matching
//! [`ChunkArray`]. Built-in element types are always known. User types are
//! added with [`AttributeRegistry::register`], or implicitly when
//! `add_attribute::<T>` is called on a container.

use hashbrown::HashMap;
use once_cell::sync::Lazy;

use crate::data::chunk_array::{AttributeArray, ChunkArray};
use crate::data::value::AttributeValue;
use crate::topology::dart::Dart;

/// Builds an empty array with the given chunk size.
pub type ArrayConstructor = fn(usize) -> Box<dyn AttributeArray>;

fn construct<T: AttributeValue>(chunk_size: usize) -> Box<dyn AttributeArray> {
    Box::new(ChunkArray::<T>::new(chunk_size))
}

static BUILTIN: Lazy<HashMap<&'static str, ArrayConstructor>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, ArrayConstructor> = HashMap::new();
    m.insert(bool::TYPE_NAME, construct::<bool>);
    m.insert(u8::TYPE_NAME, construct::<u8>);
    m.insert(i8::TYPE_NAME, construct::<i8>);
    m.insert(u16::TYPE_NAME, construct::<u16>);
    m.insert(i16::TYPE_NAME, construct::<i16>);
    m.insert(u32::TYPE_NAME, construct::<u32>);
    m.insert(i32::TYPE_NAME, construct::<i32>);
    m.insert(u64::TYPE_NAME, construct::<u64>);
    m.insert(i64::TYPE_NAME, construct::<i64>);
    m.insert(f32::TYPE_NAME, construct::<f32>);
    m.insert(f64::TYPE_NAME, construct::<f64>);
    m.insert(String::TYPE_NAME, construct::<String>);
    m.insert(<Vec<u32>>::TYPE_NAME, construct::<Vec<u32>>);
    m.insert(<[f32; 3]>::TYPE_NAME, construct::<[f32; 3]>);
    m.insert(<[f64; 3]>::TYPE_NAME, construct::<[f64; 3]>);
    m.insert(Dart::TYPE_NAME, construct::<Dart>);
    m
});

/// Type-name → array constructor table.
#[derive(Clone, Debug)]
pub struct AttributeRegistry {
    constructors: HashMap<&'static str, ArrayConstructor>,
}

impl Default for AttributeRegistry {
    fn default() -> Self {
        Self {
            constructors: BUILTIN.clone(),
        }
    }
}

impl AttributeRegistry {
    /// Make `T` loadable. Registering twice is harmless.
    pub fn register<T: AttributeValue>(&mut self) {
        self.constructors
            .entry(T::TYPE_NAME)
            .or_insert(construct::<T> as ArrayConstructor);
    }

    /// Whether arrays of `type_name` can be rebuilt.
    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    /// Fresh empty array for `type_name`, if known.
    pub fn create(&self, type_name: &str, chunk_size: usize) -> Option<Box<dyn AttributeArray>> {
        self.constructors.get(type_name).map(|ctor| ctor(chunk_size))
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.constructors.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Tag(u8);

    impl AttributeValue for Tag {
        const TYPE_NAME: &'static str = "test::Tag";
        fn encode<B: bytes::BufMut>(&self, buf: &mut B) {
            buf.put_u8(self.0);
        }
        fn decode<B: bytes::Buf>(buf: &mut B) -> Option<Self> {
            u8::decode(buf).map(Tag)
        }
    }

    #[test]
    fn builtins_are_known() {
        let r = AttributeRegistry::default();
        for name in ["u32", "f64", "Dart", "[f64;3]", "String"] {
            assert!(r.contains(name), "{name} missing");
        }
        let arr = r.create("f64", 8).unwrap();
        assert_eq!(arr.type_name(), "f64");
        assert_eq!(arr.nb_chunks(), 0);
    }

    #[test]
    fn register_user_type() {
        let mut r = AttributeRegistry::default();
        assert!(r.create("test::Tag", 4).is_none());
        r.register::<Tag>();
        r.register::<Tag>();
        assert!(r.contains("test::Tag"));
        assert!(r.type_names().contains(&"test::Tag"));
    }
}
