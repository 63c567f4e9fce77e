//! Chunked attribute arrays.
//!
//! A [`ChunkArray`] stores its elements in fixed-size boxed chunks, so growing
//! the array never moves existing elements and the per-element cost of
//! `add_chunk` is amortised over `chunk_size` insertions. Indexing is O(1):
//! `chunks[i / chunk_size][i % chunk_size]`.
//!
//! The object-safe [`AttributeArray`] trait erases the element type so an
//! [`AttributeContainer`](crate::data::container::AttributeContainer) can keep
//! heterogeneous arrays side by side and relocate lines in all of them at once.
//!
//! ## Payload format
//! `save` writes `[nb_lines: u32 LE][byte_len: u32 LE][bytes]`, the elements
//! `0..nb_lines` encoded back to back with their [`AttributeValue`] codec.
//! The byte length prefix lets a reader [`skip`] an array whose element type
//! it does not know.

use std::any::Any;
use std::io::{Read, Write};
use std::ops::{Index, IndexMut};

use bytes::BytesMut;

use crate::data::value::AttributeValue;
use crate::mesh_error::MeshCmapError;

/// Growable array of `T` stored in chunks of `chunk_size` elements.
#[derive(Clone, Debug)]
pub struct ChunkArray<T> {
    chunk_size: usize,
    chunks: Vec<Box<[T]>>,
}

impl<T: AttributeValue> ChunkArray<T> {
    /// Empty array (zero chunks).
    ///
    /// # Panics
    /// Panics if `chunk_size == 0`.
    pub fn new(chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be positive");
        Self {
            chunk_size,
            chunks: Vec::new(),
        }
    }

    /// Elements per chunk.
    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Chunks allocated so far.
    #[inline]
    pub fn nb_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// Number of addressable elements (`nb_chunks * chunk_size`).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.chunks.len() * self.chunk_size
    }

    /// Append one chunk of default-initialised elements.
    pub fn add_chunk(&mut self) {
        self.chunks
            .push(vec![T::default(); self.chunk_size].into_boxed_slice());
    }

    /// Grow or shrink to exactly `n` chunks.
    pub fn set_nb_chunks(&mut self, n: usize) {
        if n < self.chunks.len() {
            self.chunks.truncate(n);
        } else {
            while self.chunks.len() < n {
                self.add_chunk();
            }
        }
    }

    /// Drop every chunk.
    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    /// Overwrite every addressable element with `value`.
    pub fn fill(&mut self, value: T) {
        for chunk in &mut self.chunks {
            chunk.fill(value.clone());
        }
    }

    #[inline]
    fn locate(&self, i: u32) -> (usize, usize) {
        let i = i as usize;
        assert!(
            i < self.capacity(),
            "index {i} out of range (capacity {})",
            self.capacity()
        );
        (i / self.chunk_size, i % self.chunk_size)
    }

    /// # Panics
    /// Panics if `i` is beyond the capacity.
    #[inline]
    pub fn get(&self, i: u32) -> &T {
        let (c, o) = self.locate(i);
        &self.chunks[c][o]
    }

    /// # Panics
    /// Panics if `i` is beyond the capacity.
    #[inline]
    pub fn get_mut(&mut self, i: u32) -> &mut T {
        let (c, o) = self.locate(i);
        &mut self.chunks[c][o]
    }

    /// Overwrite element `i`.
    #[inline]
    pub fn set(&mut self, i: u32, value: T) {
        *self.get_mut(i) = value;
    }

    /// Reset element `i` to `T::default()`.
    pub fn init_element(&mut self, i: u32) {
        self.set(i, T::default());
    }

    /// Clone element `src` into `dst`.
    pub fn copy_element(&mut self, dst: u32, src: u32) {
        let v = self.get(src).clone();
        self.set(dst, v);
    }

    /// Move element `src` into `dst`, leaving `T::default()` behind.
    pub fn move_element(&mut self, dst: u32, src: u32) {
        let v = std::mem::take(self.get_mut(src));
        self.set(dst, v);
    }

    /// Exchange two elements.
    pub fn swap_elements(&mut self, a: u32, b: u32) {
        if a == b {
            return;
        }
        let va = std::mem::take(self.get_mut(a));
        let vb = std::mem::replace(self.get_mut(b), va);
        self.set(a, vb);
    }

    /// Iterate over the first `n` elements.
    pub fn iter_lines(&self, n: u32) -> impl Iterator<Item = &T> + '_ {
        self.chunks.iter().flat_map(|c| c.iter()).take(n as usize)
    }

    /// Write elements `0..nb_lines`.
    pub fn save<W: Write + ?Sized>(&self, w: &mut W, nb_lines: u32) -> Result<(), MeshCmapError> {
        let mut payload = BytesMut::new();
        for v in self.iter_lines(nb_lines) {
            v.encode(&mut payload);
        }
        write_u32(w, nb_lines)?;
        write_u32(w, payload.len() as u32)?;
        w.write_all(&payload)?;
        Ok(())
    }

    /// Replace the content with a payload written by [`save`](Self::save).
    /// Returns the number of lines read; the array is resized to the
    /// minimal number of chunks holding them.
    pub fn load<R: Read + ?Sized>(&mut self, r: &mut R) -> Result<u32, MeshCmapError> {
        let nb_lines = read_u32(r)?;
        let byte_len = read_u32(r)? as usize;
        let mut raw = vec![0u8; byte_len];
        read_exact(r, &mut raw)?;

        self.clear();
        self.set_nb_chunks((nb_lines as usize).div_ceil(self.chunk_size));
        let mut buf: &[u8] = &raw;
        for i in 0..nb_lines {
            let v = T::decode(&mut buf).ok_or(MeshCmapError::TruncatedPayload {
                expected: byte_len,
                found: byte_len - buf.len(),
            })?;
            self.set(i, v);
        }
        Ok(nb_lines)
    }
}

impl<T> ChunkArray<T> {
    /// Consume one saved payload without decoding it.
    pub fn skip<R: Read + ?Sized>(r: &mut R) -> Result<(), MeshCmapError> {
        let _nb_lines = read_u32(r)?;
        let byte_len = read_u32(r)? as u64;
        let copied = std::io::copy(&mut (&mut *r).take(byte_len), &mut std::io::sink())?;
        if copied != byte_len {
            return Err(MeshCmapError::TruncatedPayload {
                expected: byte_len as usize,
                found: copied as usize,
            });
        }
        Ok(())
    }
}

impl<T: AttributeValue> Index<u32> for ChunkArray<T> {
    type Output = T;
    #[inline]
    fn index(&self, i: u32) -> &T {
        self.get(i)
    }
}

impl<T: AttributeValue> IndexMut<u32> for ChunkArray<T> {
    #[inline]
    fn index_mut(&mut self, i: u32) -> &mut T {
        self.get_mut(i)
    }
}

/// Type-erased view of a [`ChunkArray`] used by containers.
pub trait AttributeArray: Any + Send + Sync {
    /// Registry name of the element type.
    fn type_name(&self) -> &'static str;
    /// See [`ChunkArray::nb_chunks`].
    fn nb_chunks(&self) -> usize;
    /// See [`ChunkArray::add_chunk`].
    fn add_chunk(&mut self);
    /// See [`ChunkArray::set_nb_chunks`].
    fn set_nb_chunks(&mut self, n: usize);
    /// See [`ChunkArray::clear`].
    fn clear(&mut self);
    /// See [`ChunkArray::init_element`].
    fn init_element(&mut self, i: u32);
    /// See [`ChunkArray::copy_element`].
    fn copy_element(&mut self, dst: u32, src: u32);
    /// See [`ChunkArray::move_element`].
    fn move_element(&mut self, dst: u32, src: u32);
    /// See [`ChunkArray::swap_elements`].
    fn swap_elements(&mut self, a: u32, b: u32);
    /// Write the first `nb_lines` elements.
    fn save(&self, w: &mut dyn Write, nb_lines: u32) -> Result<(), MeshCmapError>;
    /// Replace the content; returns the number of lines read.
    fn load(&mut self, r: &mut dyn Read) -> Result<u32, MeshCmapError>;
    /// Deep copy behind a new box.
    fn clone_array(&self) -> Box<dyn AttributeArray>;
    /// Downcast hook for typed access.
    fn as_any(&self) -> &dyn Any;
    /// Mutable downcast hook.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: AttributeValue> AttributeArray for ChunkArray<T> {
    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }
    fn nb_chunks(&self) -> usize {
        ChunkArray::nb_chunks(self)
    }
    fn add_chunk(&mut self) {
        ChunkArray::add_chunk(self)
    }
    fn set_nb_chunks(&mut self, n: usize) {
        ChunkArray::set_nb_chunks(self, n)
    }
    fn clear(&mut self) {
        ChunkArray::clear(self)
    }
    fn init_element(&mut self, i: u32) {
        ChunkArray::init_element(self, i)
    }
    fn copy_element(&mut self, dst: u32, src: u32) {
        ChunkArray::copy_element(self, dst, src)
    }
    fn move_element(&mut self, dst: u32, src: u32) {
        ChunkArray::move_element(self, dst, src)
    }
    fn swap_elements(&mut self, a: u32, b: u32) {
        ChunkArray::swap_elements(self, a, b)
    }
    fn save(&self, w: &mut dyn Write, nb_lines: u32) -> Result<(), MeshCmapError> {
        ChunkArray::save(self, w, nb_lines)
    }
    fn load(&mut self, r: &mut dyn Read) -> Result<u32, MeshCmapError> {
        ChunkArray::load(self, r)
    }
    fn clone_array(&self) -> Box<dyn AttributeArray> {
        Box::new(self.clone())
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub(crate) fn write_u32<W: Write + ?Sized>(w: &mut W, v: u32) -> Result<(), MeshCmapError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub(crate) fn read_u32<R: Read + ?Sized>(r: &mut R) -> Result<u32, MeshCmapError> {
    let mut raw = [0u8; 4];
    read_exact(r, &mut raw)?;
    Ok(u32::from_le_bytes(raw))
}

pub(crate) fn read_exact<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> Result<(), MeshCmapError> {
    let expected = buf.len();
    r.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => MeshCmapError::TruncatedPayload {
            expected,
            found: 0,
        },
        _ => MeshCmapError::from(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_grow_and_index() {
        let mut a = ChunkArray::<u32>::new(4);
        assert_eq!(a.capacity(), 0);
        a.add_chunk();
        a.add_chunk();
        assert_eq!(a.capacity(), 8);
        for i in 0..8 {
            a[i] = i * 10;
        }
        assert_eq!(a[5], 50);
        a.set_nb_chunks(1);
        assert_eq!(a.capacity(), 4);
        assert_eq!(a[3], 30);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn index_past_capacity_panics() {
        let mut a = ChunkArray::<u8>::new(4);
        a.add_chunk();
        let _ = a[4];
    }

    #[test]
    fn move_leaves_default() {
        let mut a = ChunkArray::<String>::new(2);
        a.set_nb_chunks(2);
        a[3] = "moved".into();
        a.move_element(0, 3);
        assert_eq!(a[0], "moved");
        assert!(a[3].is_empty());
        a.copy_element(1, 0);
        assert_eq!(a[1], "moved");
        a.swap_elements(1, 2);
        assert_eq!(a[2], "moved");
        assert!(a[1].is_empty());
    }

    #[test]
    fn save_load_and_skip() {
        let mut a = ChunkArray::<f64>::new(3);
        a.set_nb_chunks(2);
        for i in 0..5u32 {
            a[i] = f64::from(i) + 0.25;
        }
        let mut out = Vec::new();
        a.save(&mut out, 5).unwrap();
        a.save(&mut out, 2).unwrap();

        let mut r: &[u8] = &out;
        let mut b = ChunkArray::<f64>::new(2);
        assert_eq!(b.load(&mut r).unwrap(), 5);
        assert_eq!(b.nb_chunks(), 3);
        assert_eq!(b[4], 4.25);
        ChunkArray::<f64>::skip(&mut r).unwrap();
        assert!(r.is_empty());
    }

    #[test]
    fn truncated_payload_is_reported() {
        let mut a = ChunkArray::<u32>::new(4);
        a.add_chunk();
        let mut out = Vec::new();
        a.save(&mut out, 4).unwrap();
        out.truncate(out.len() - 3);
        let mut r: &[u8] = &out;
        let err = ChunkArray::<u32>::new(4).load(&mut r).unwrap_err();
        assert!(matches!(err, MeshCmapError::TruncatedPayload { .. }));
    }
}
