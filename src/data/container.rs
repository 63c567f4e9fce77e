//! Reference-counted line allocator shared by a set of attribute arrays.
//!
//! An [`AttributeContainer`] owns every array of one abstraction level (the
//! darts of a map, or the cells of one orbit) and hands out *line* indices
//! that address the same slot in all of them. Lines are allocated and freed
//! in blocks of `PRIM_SIZE`; freed blocks go on a LIFO stack of holes and are
//! reused before the container grows.
//!
//! ## Reference counts
//! `insert_lines` sets the count of each new line to **1**, the baseline
//! meaning "allocated, no external owner". Every external reference (a dart
//! pointing at a cell line) adds one with [`ref_line`]. [`unref_line`]
//! requires a count above the baseline, decrements it, and reclaims the line
//! when it falls back to 1. A line with count 0 is free.
//!
//! ## Save format
//! ```text
//! [nb_attributes u32][nb_used u32][nb_max u32]
//! nb_attributes × [name_len+1 u32][type_name_len+1 u32]
//! nb_attributes × name\0 type_name\0
//! nb_attributes × array payload (see chunk_array)
//! refs payload
//! [nb_holes u32][holes...]
//! [nb_markers u32] nb_markers × marker payload
//! ```
//!
//! [`ref_line`]: AttributeContainer::ref_line
//! [`unref_line`]: AttributeContainer::unref_line

use std::io::{Read, Write};

use crate::data::chunk_array::{AttributeArray, ChunkArray, read_exact, read_u32, write_u32};
use crate::data::registry::AttributeRegistry;
use crate::data::value::AttributeValue;
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshCmapError;

/// Sentinel for "no line".
pub const INVALID_INDEX: u32 = u32::MAX;

/// Generational handle on an attribute slot. A removed attribute bumps the
/// slot's generation so stale handles are detected.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct AttributeId {
    slot: u32,
    generation: u32,
}

/// Handle on a persistent boolean marker array of a container.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MarkerId(u32);

struct Entry {
    name: String,
    array: Box<dyn AttributeArray>,
}

/// Lines shared by named attribute arrays, with reference counts and holes.
pub struct AttributeContainer {
    chunk_size: usize,
    entries: Vec<Option<Entry>>,
    generations: Vec<u32>,
    markers: Vec<Option<ChunkArray<bool>>>,
    refs: ChunkArray<u32>,
    holes: Vec<u32>,
    nb_used: u32,
    nb_max: u32,
    registry: AttributeRegistry,
}

impl std::fmt::Debug for AttributeContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeContainer")
            .field("chunk_size", &self.chunk_size)
            .field("attributes", &self.attribute_names())
            .field("nb_used", &self.nb_used)
            .field("nb_max", &self.nb_max)
            .field("holes", &self.holes.len())
            .finish()
    }
}

impl AttributeContainer {
    /// Empty container with the built-in type registry.
    pub fn new(chunk_size: usize) -> Self {
        Self::with_registry(chunk_size, AttributeRegistry::default())
    }

    /// Empty container that loads types known to `registry`.
    pub fn with_registry(chunk_size: usize, registry: AttributeRegistry) -> Self {
        Self {
            chunk_size,
            entries: Vec::new(),
            generations: Vec::new(),
            markers: Vec::new(),
            refs: ChunkArray::new(chunk_size),
            holes: Vec::new(),
            nb_used: 0,
            nb_max: 0,
            registry,
        }
    }

    /// Elements per chunk in every array.
    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Chunks allocated in each array.
    #[inline]
    pub fn nb_chunks(&self) -> usize {
        self.refs.nb_chunks()
    }

    /// Addressable lines without growing.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.refs.capacity()
    }

    /// Number of lines in use.
    #[inline]
    pub fn size(&self) -> u32 {
        self.nb_used
    }

    /// One past the highest line ever allocated since the last compaction.
    #[inline]
    pub fn nb_max(&self) -> u32 {
        self.nb_max
    }

    /// Freed blocks, the next one to reuse last.
    pub fn holes(&self) -> &[u32] {
        &self.holes
    }

    /// Types this container can rebuild on load.
    pub fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    /// Register extra types before a load.
    pub fn registry_mut(&mut self) -> &mut AttributeRegistry {
        &mut self.registry
    }

    /// Ratio of used lines to allocated lines (1.0 when empty).
    pub fn fragmentation(&self) -> f32 {
        if self.nb_max == 0 {
            1.0
        } else {
            self.nb_used as f32 / self.nb_max as f32
        }
    }

    // ---------------------------------------------------------------------
    // Attributes
    // ---------------------------------------------------------------------

    fn slot_of(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.as_ref().is_some_and(|e| e.name == name))
    }

    fn id_of_slot(&self, slot: usize) -> AttributeId {
        AttributeId {
            slot: slot as u32,
            generation: self.generations[slot],
        }
    }

    fn entry(&self, id: AttributeId) -> Option<&Entry> {
        let slot = id.slot as usize;
        if self.generations.get(slot) != Some(&id.generation) {
            return None;
        }
        self.entries[slot].as_ref()
    }

    fn entry_mut(&mut self, id: AttributeId) -> Option<&mut Entry> {
        let slot = id.slot as usize;
        if self.generations.get(slot) != Some(&id.generation) {
            return None;
        }
        self.entries[slot].as_mut()
    }

    fn insert_entry(&mut self, name: String, array: Box<dyn AttributeArray>) -> AttributeId {
        let entry = Some(Entry { name, array });
        match self.entries.iter().position(Option::is_none) {
            Some(slot) => {
                self.entries[slot] = entry;
                self.id_of_slot(slot)
            }
            None => {
                self.entries.push(entry);
                self.generations.push(0);
                self.id_of_slot(self.entries.len() - 1)
            }
        }
    }

    /// Add an attribute of element type `T`, sized to the current capacity.
    /// Returns `None` (with a warning) if the name is empty or taken.
    pub fn add_attribute<T: AttributeValue>(&mut self, name: &str) -> Option<AttributeId> {
        if name.is_empty() {
            log::warn!("add_attribute: empty attribute name");
            return None;
        }
        if self.slot_of(name).is_some() {
            log::warn!("add_attribute: attribute `{name}` already exists");
            return None;
        }
        self.registry.register::<T>();
        let mut array = ChunkArray::<T>::new(self.chunk_size);
        array.set_nb_chunks(self.nb_chunks());
        Some(self.insert_entry(name.to_owned(), Box::new(array)))
    }

    /// Look up an attribute by name, checking its element type.
    pub fn get_attribute<T: AttributeValue>(&self, name: &str) -> Option<AttributeId> {
        let Some(slot) = self.slot_of(name) else {
            log::warn!("get_attribute: no attribute named `{name}`");
            return None;
        };
        let id = self.id_of_slot(slot);
        let found = self.entry(id).map(|e| e.array.type_name());
        if found != Some(T::TYPE_NAME) {
            log::warn!(
                "get_attribute: `{name}` holds {:?}, not {}",
                found,
                T::TYPE_NAME
            );
            return None;
        }
        Some(id)
    }

    /// Look up an attribute by name whatever its element type.
    pub fn attribute_id(&self, name: &str) -> Option<AttributeId> {
        self.slot_of(name).map(|slot| self.id_of_slot(slot))
    }

    /// Remove an attribute. Returns `false` for a stale or unknown id.
    pub fn remove_attribute(&mut self, id: AttributeId) -> bool {
        if self.entry(id).is_none() {
            log::warn!("remove_attribute: stale attribute id {id:?}");
            return false;
        }
        let slot = id.slot as usize;
        self.entries[slot] = None;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        true
    }

    /// `false` once the attribute has been removed.
    pub fn is_valid(&self, id: AttributeId) -> bool {
        self.entry(id).is_some()
    }

    /// Name of a live attribute.
    pub fn attribute_name(&self, id: AttributeId) -> Option<&str> {
        self.entry(id).map(|e| e.name.as_str())
    }

    /// Live attributes, markers excluded.
    pub fn nb_attributes(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    /// Names of live attributes in slot order.
    pub fn attribute_names(&self) -> Vec<&str> {
        self.entries.iter().flatten().map(|e| e.name.as_str()).collect()
    }

    /// Element type names, in the order of [`attribute_names`](Self::attribute_names).
    pub fn type_names(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .flatten()
            .map(|e| e.array.type_name())
            .collect()
    }

    /// Typed view of an attribute, or `None` for a stale id or a type mismatch.
    pub fn array<T: AttributeValue>(&self, id: AttributeId) -> Option<&ChunkArray<T>> {
        self.entry(id)?.array.as_any().downcast_ref::<ChunkArray<T>>()
    }

    /// Mutable typed view, `None` for a stale id or a type mismatch.
    pub fn array_mut<T: AttributeValue>(&mut self, id: AttributeId) -> Option<&mut ChunkArray<T>> {
        self.entry_mut(id)?
            .array
            .as_any_mut()
            .downcast_mut::<ChunkArray<T>>()
    }

    /// Typed view for ids the caller owns (relations, embeddings).
    ///
    /// # Panics
    /// Panics if the id is stale or of another element type.
    #[inline]
    pub fn typed<T: AttributeValue>(&self, id: AttributeId) -> &ChunkArray<T> {
        match self.array::<T>(id) {
            Some(a) => a,
            None => panic!("attribute handle {id:?} used after removal or with the wrong type"),
        }
    }

    /// Mutable counterpart of [`typed`](Self::typed).
    #[inline]
    pub fn typed_mut<T: AttributeValue>(&mut self, id: AttributeId) -> &mut ChunkArray<T> {
        match self.array_mut::<T>(id) {
            Some(a) => a,
            None => panic!("attribute handle {id:?} used after removal or with the wrong type"),
        }
    }

    /// Exchange the contents of two attributes of the same element type.
    pub fn swap_data_attributes(&mut self, a: AttributeId, b: AttributeId) -> bool {
        let (Some(ta), Some(tb)) = (
            self.entry(a).map(|e| e.array.type_name()),
            self.entry(b).map(|e| e.array.type_name()),
        ) else {
            return false;
        };
        if ta != tb {
            log::warn!("swap_data_attributes: type mismatch ({ta} vs {tb})");
            return false;
        }
        if a == b {
            return true;
        }
        let (sa, sb) = (a.slot as usize, b.slot as usize);
        let (Some(mut ea), Some(mut eb)) = (self.entries[sa].take(), self.entries[sb].take()) else {
            return false;
        };
        std::mem::swap(&mut ea.array, &mut eb.array);
        self.entries[sa] = Some(ea);
        self.entries[sb] = Some(eb);
        true
    }

    /// Overwrite `dst` with a copy of `src` (same element type required).
    pub fn copy_data_attribute(&mut self, dst: AttributeId, src: AttributeId) -> bool {
        let Some(copy) = self.entry(src).map(|e| e.array.clone_array()) else {
            return false;
        };
        let Some(entry) = self.entry_mut(dst) else {
            return false;
        };
        if entry.array.type_name() != copy.type_name() {
            log::warn!("copy_data_attribute: type mismatch");
            return false;
        }
        entry.array = copy;
        true
    }

    // ---------------------------------------------------------------------
    // Persistent markers
    // ---------------------------------------------------------------------

    /// Boolean array that grows and compacts with the container.
    pub fn add_marker_attribute(&mut self) -> MarkerId {
        let mut m = ChunkArray::<bool>::new(self.chunk_size);
        m.set_nb_chunks(self.nb_chunks());
        match self.markers.iter().position(Option::is_none) {
            Some(slot) => {
                self.markers[slot] = Some(m);
                MarkerId(slot as u32)
            }
            None => {
                self.markers.push(Some(m));
                MarkerId(self.markers.len() as u32 - 1)
            }
        }
    }

    /// Free a marker slot. Removing twice is a no-op.
    pub fn remove_marker_attribute(&mut self, id: MarkerId) {
        if let Some(slot) = self.markers.get_mut(id.0 as usize) {
            *slot = None;
        }
    }

    /// # Panics
    /// Panics if the marker was removed.
    pub fn marker(&self, id: MarkerId) -> &ChunkArray<bool> {
        match self.markers.get(id.0 as usize) {
            Some(Some(m)) => m,
            _ => panic!("marker {id:?} was removed"),
        }
    }

    /// # Panics
    /// Panics if the marker was removed.
    pub fn marker_mut(&mut self, id: MarkerId) -> &mut ChunkArray<bool> {
        match self.markers.get_mut(id.0 as usize) {
            Some(Some(m)) => m,
            _ => panic!("marker {id:?} was removed"),
        }
    }

    // ---------------------------------------------------------------------
    // Line management
    // ---------------------------------------------------------------------

    fn for_each_array(&mut self, mut f: impl FnMut(&mut dyn AttributeArray)) {
        for e in self.entries.iter_mut().flatten() {
            f(e.array.as_mut());
        }
        for m in self.markers.iter_mut().flatten() {
            f(m);
        }
        f(&mut self.refs);
    }

    fn add_chunk(&mut self) {
        self.for_each_array(|a| a.add_chunk());
    }

    fn set_nb_chunks(&mut self, n: usize) {
        self.for_each_array(|a| a.set_nb_chunks(n));
    }

    /// Allocate a block of `PRIM_SIZE` lines and return its first index.
    /// A hole is reused when available (last freed first).
    pub fn insert_lines<const PRIM_SIZE: u32>(&mut self) -> u32 {
        assert!(
            PRIM_SIZE > 0 && PRIM_SIZE as usize <= self.chunk_size,
            "PRIM_SIZE must be in 1..=chunk_size"
        );
        let index = match self.holes.pop() {
            Some(hole) => hole,
            None => {
                let index = self.nb_max;
                self.nb_max += PRIM_SIZE;
                while self.nb_max as usize > self.capacity() {
                    self.add_chunk();
                }
                index
            }
        };
        for i in index..index + PRIM_SIZE {
            self.refs[i] = 1;
            self.init_markers_of_line(i);
        }
        self.nb_used += PRIM_SIZE;
        index
    }

    /// Free the block containing `index`.
    ///
    /// # Panics
    /// Panics if the block is not in use.
    pub fn remove_lines<const PRIM_SIZE: u32>(&mut self, index: u32) {
        let begin = index - index % PRIM_SIZE;
        assert!(self.used(begin), "remove_lines: line {begin} is not in use");
        self.holes.push(begin);
        for i in begin..begin + PRIM_SIZE {
            self.refs[i] = 0;
        }
        self.nb_used -= PRIM_SIZE;
    }

    /// Whether line `index` is allocated.
    #[inline]
    pub fn used(&self, index: u32) -> bool {
        (index as usize) < self.capacity() && self.refs[index] != 0
    }

    /// Reference count of a line: 0 free, 1 baseline.
    #[inline]
    pub fn nb_refs(&self, index: u32) -> u32 {
        self.refs[index]
    }

    /// Add one external reference to an allocated line.
    #[inline]
    pub fn ref_line(&mut self, index: u32) {
        debug_assert!(self.used(index), "ref_line on free line {index}");
        self.refs[index] += 1;
    }

    /// Drop one reference; returns `true` if the line was reclaimed.
    ///
    /// # Panics
    /// Panics if the line has no reference above the baseline.
    pub fn unref_line(&mut self, index: u32) -> bool {
        assert!(
            self.refs[index] > 1,
            "unref_line: line {index} has no external reference"
        );
        self.refs[index] -= 1;
        if self.refs[index] == 1 {
            self.refs[index] = 0;
            self.holes.push(index);
            self.nb_used -= 1;
            return true;
        }
        false
    }

    /// Reset every attribute and marker of line `index`.
    pub fn init_line(&mut self, index: u32) {
        for e in self.entries.iter_mut().flatten() {
            e.array.init_element(index);
        }
        self.init_markers_of_line(index);
    }

    /// Clear every marker of line `index`.
    pub fn init_markers_of_line(&mut self, index: u32) {
        for m in self.markers.iter_mut().flatten() {
            m[index] = false;
        }
    }

    /// Copy attribute and marker values (not the reference count).
    pub fn copy_line(&mut self, dst: u32, src: u32) {
        for e in self.entries.iter_mut().flatten() {
            e.array.copy_element(dst, src);
        }
        for m in self.markers.iter_mut().flatten() {
            m.copy_element(dst, src);
        }
    }

    /// Relocate a line: data, markers and reference count. `src` becomes free.
    pub fn move_line(&mut self, dst: u32, src: u32) {
        for e in self.entries.iter_mut().flatten() {
            e.array.move_element(dst, src);
        }
        for m in self.markers.iter_mut().flatten() {
            m.move_element(dst, src);
        }
        self.refs.move_element(dst, src);
    }

    // ---------------------------------------------------------------------
    // Iteration
    // ---------------------------------------------------------------------

    /// First used line, or [`end`](Self::end) if there is none.
    pub fn begin(&self) -> u32 {
        let mut it = 0;
        while it < self.nb_max && !self.used(it) {
            it += 1;
        }
        it
    }

    /// One past the last line a forward walk can visit.
    #[inline]
    pub fn end(&self) -> u32 {
        self.nb_max
    }

    /// Next used line after `index`, or [`end`](Self::end).
    pub fn next(&self, index: u32) -> u32 {
        let mut it = index + 1;
        while it < self.nb_max && !self.used(it) {
            it += 1;
        }
        it
    }

    /// Last used line, or [`rend`](Self::rend) if the container is empty.
    pub fn rbegin(&self) -> u32 {
        match self.nb_max {
            0 => self.rend(),
            n => {
                let last = n - 1;
                if self.used(last) { last } else { self.rnext(last) }
            }
        }
    }

    /// Past-the-front sentinel of a reverse walk.
    #[inline]
    pub fn rend(&self) -> u32 {
        INVALID_INDEX
    }

    /// Previous used line before `index`, or [`rend`](Self::rend).
    pub fn rnext(&self, index: u32) -> u32 {
        let mut it = index;
        loop {
            if it == 0 {
                return self.rend();
            }
            it -= 1;
            if self.used(it) {
                return it;
            }
        }
    }

    /// First line of the block after the one containing `index`.
    pub fn next_primitive<const PRIM_SIZE: u32>(&self, index: u32) -> u32 {
        let mut it = index - index % PRIM_SIZE + PRIM_SIZE;
        while it < self.nb_max && !self.used(it) {
            it += PRIM_SIZE;
        }
        it
    }

    /// Used lines in increasing order.
    pub fn lines(&self) -> impl Iterator<Item = u32> + '_ {
        let end = self.end();
        std::iter::successors(Some(self.begin()), move |&i| Some(self.next(i)))
            .take_while(move |&i| i < end)
    }

    // ---------------------------------------------------------------------
    // Compaction
    // ---------------------------------------------------------------------

    /// Fill the holes below `size()` with the topmost used blocks, then
    /// shrink every array to the minimal number of chunks.
    ///
    /// Returns the old → new index map, sized to the old `nb_max`: used lines
    /// map to their new index (themselves if they did not move), free lines
    /// map to [`INVALID_INDEX`].
    pub fn compact<const PRIM_SIZE: u32>(&mut self) -> Vec<u32> {
        let mut map: Vec<u32> = (0..self.nb_max)
            .map(|i| if self.used(i) { i } else { INVALID_INDEX })
            .collect();
        if self.holes.is_empty() {
            return map;
        }

        let mut up = self.rbegin();
        let mut moved = 0u32;
        while let Some(down) = self.holes.pop() {
            if down >= self.nb_used {
                continue;
            }
            for i in 0..PRIM_SIZE {
                let rdown = down + PRIM_SIZE - 1 - i;
                map[up as usize] = rdown;
                self.move_line(rdown, up);
                up = self.rnext(up);
                moved += 1;
            }
        }

        self.nb_max = self.nb_used;
        self.holes.clear();
        let nb_chunks = (self.nb_max as usize).div_ceil(self.chunk_size);
        self.set_nb_chunks(nb_chunks);
        log::debug!(
            "compact: moved {moved} lines, {} lines in {nb_chunks} chunks",
            self.nb_max
        );
        map
    }

    // ---------------------------------------------------------------------
    // Reset
    // ---------------------------------------------------------------------

    /// Drop every line, keep the attributes.
    pub fn clear_attributes(&mut self) {
        self.set_nb_chunks(0);
        self.holes.clear();
        self.nb_used = 0;
        self.nb_max = 0;
    }

    /// Drop every line and every attribute and marker.
    pub fn remove_attributes(&mut self) {
        self.clear_attributes();
        for (slot, e) in self.entries.iter_mut().enumerate() {
            if e.take().is_some() {
                self.generations[slot] = self.generations[slot].wrapping_add(1);
            }
        }
        self.markers.clear();
    }

    // ---------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------

    /// Write every attribute, the reference counts, the holes and the markers.
    pub fn save<W: Write + ?Sized>(&self, w: &mut W) -> Result<(), MeshCmapError> {
        let live: Vec<&Entry> = self.entries.iter().flatten().collect();
        write_u32(w, live.len() as u32)?;
        write_u32(w, self.nb_used)?;
        write_u32(w, self.nb_max)?;
        for e in &live {
            write_u32(w, e.name.len() as u32 + 1)?;
            write_u32(w, e.array.type_name().len() as u32 + 1)?;
        }
        for e in &live {
            w.write_all(e.name.as_bytes())?;
            w.write_all(&[0])?;
            w.write_all(e.array.type_name().as_bytes())?;
            w.write_all(&[0])?;
        }
        for e in &live {
            let mut sink: &mut W = &mut *w;
            e.array.save(&mut sink, self.nb_max)?;
        }
        self.refs.save(w, self.nb_max)?;
        write_u32(w, self.holes.len() as u32)?;
        for h in &self.holes {
            write_u32(w, *h)?;
        }
        let markers: Vec<&ChunkArray<bool>> = self.markers.iter().flatten().collect();
        write_u32(w, markers.len() as u32)?;
        for m in markers {
            m.save(w, self.nb_max)?;
        }
        Ok(())
    }

    /// Replace the whole content with a saved container. Attributes whose
    /// type is unknown to the registry are skipped with a warning.
    ///
    /// The stream is decoded and validated before anything is replaced: on
    /// error `self` is left untouched. Handles from before a successful load
    /// are stale.
    pub fn load<R: Read + ?Sized>(&mut self, r: &mut R) -> Result<(), MeshCmapError> {
        let mut fresh = Self::with_registry(self.chunk_size, self.registry.clone());
        fresh.read_content(r)?;
        fresh.validate_invariants()?;

        let Self { entries, markers, refs, holes, nb_used, nb_max, .. } = fresh;
        self.remove_attributes();
        for e in entries.into_iter().flatten() {
            self.insert_entry(e.name, e.array);
        }
        self.markers = markers;
        self.refs = refs;
        self.holes = holes;
        self.nb_used = nb_used;
        self.nb_max = nb_max;
        Ok(())
    }

    fn read_content<R: Read + ?Sized>(&mut self, r: &mut R) -> Result<(), MeshCmapError> {
        let nb_attributes = read_u32(r)? as usize;
        let nb_used = read_u32(r)?;
        let nb_max = read_u32(r)?;
        if nb_used > nb_max {
            return Err(MeshCmapError::CorruptedContainer(format!(
                "nb_used {nb_used} exceeds nb_max {nb_max}"
            )));
        }

        let mut lengths = Vec::with_capacity(nb_attributes);
        for _ in 0..nb_attributes {
            let name_len = read_u32(r)? as usize;
            let type_len = read_u32(r)? as usize;
            lengths.push((name_len, type_len));
        }
        let mut names = Vec::with_capacity(nb_attributes);
        for &(name_len, type_len) in &lengths {
            let name = read_name(r, name_len)?;
            let type_name = read_name(r, type_len)?;
            names.push((name, type_name));
        }

        for (name, type_name) in names {
            match self.registry.create(&type_name, self.chunk_size) {
                Some(mut array) => {
                    let mut src: &mut R = &mut *r;
                    array.load(&mut src)?;
                    self.insert_entry(name, array);
                }
                None => {
                    log::warn!("load: skipping attribute `{name}` of unknown type `{type_name}`");
                    ChunkArray::<u8>::skip(r)?;
                }
            }
        }

        self.refs.load(r)?;
        let nb_holes = read_u32(r)? as usize;
        self.holes = (0..nb_holes)
            .map(|_| read_u32(r))
            .collect::<Result<_, _>>()?;
        let nb_markers = read_u32(r)? as usize;
        for _ in 0..nb_markers {
            let mut m = ChunkArray::<bool>::new(self.chunk_size);
            m.load(r)?;
            self.markers.push(Some(m));
        }

        self.nb_used = nb_used;
        self.nb_max = nb_max;
        let nb_chunks = (nb_max as usize).div_ceil(self.chunk_size);
        self.set_nb_chunks(nb_chunks);
        Ok(())
    }
}

fn read_name<R: Read + ?Sized>(r: &mut R, len_with_nul: usize) -> Result<String, MeshCmapError> {
    if len_with_nul == 0 {
        return Err(MeshCmapError::InvalidName("zero-length name".into()));
    }
    let mut raw = vec![0u8; len_with_nul];
    read_exact(r, &mut raw)?;
    if raw.pop() != Some(0) {
        return Err(MeshCmapError::InvalidName("missing terminator".into()));
    }
    String::from_utf8(raw).map_err(|e| MeshCmapError::InvalidName(e.to_string()))
}

impl DebugInvariants for AttributeContainer {
    const LABEL: &'static str = "AttributeContainer";

    fn validate_invariants(&self) -> Result<(), MeshCmapError> {
        let used = (0..self.nb_max).filter(|&i| self.used(i)).count() as u32;
        if used != self.nb_used {
            return Err(MeshCmapError::ContainerMismatch(format!(
                "{used} lines with refs but nb_used = {}",
                self.nb_used
            )));
        }
        if let Some(h) = self.holes.iter().find(|&&h| self.used(h)) {
            return Err(MeshCmapError::ContainerMismatch(format!(
                "hole {h} is in use"
            )));
        }
        let n = self.nb_chunks();
        let arrays_ok = self.entries.iter().flatten().all(|e| e.array.nb_chunks() == n)
            && self.markers.iter().flatten().all(|m| m.nb_chunks() == n);
        if !arrays_ok || (self.nb_max as usize) > self.capacity() {
            return Err(MeshCmapError::ContainerMismatch(
                "arrays disagree on chunk count".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container_with(n: u32) -> (AttributeContainer, AttributeId) {
        let mut c = AttributeContainer::new(4);
        let id = c.add_attribute::<u32>("value").unwrap();
        for _ in 0..n {
            let i = c.insert_lines::<1>();
            c.typed_mut::<u32>(id)[i] = i * 100;
        }
        (c, id)
    }

    #[test]
    fn insertion_grows_whole_chunks() {
        let (c, id) = container_with(5);
        assert_eq!(c.size(), 5);
        assert_eq!(c.nb_max(), 5);
        assert_eq!(c.nb_chunks(), 2);
        assert_eq!(c.typed::<u32>(id).nb_chunks(), 2);
        assert!(c.lines().eq(0..5));
    }

    #[test]
    fn holes_are_reused_last_freed_first() {
        let (mut c, _) = container_with(6);
        c.remove_lines::<1>(1);
        c.remove_lines::<1>(4);
        assert_eq!(c.insert_lines::<1>(), 4);
        assert_eq!(c.insert_lines::<1>(), 1);
        assert_eq!(c.insert_lines::<1>(), 6);
    }

    #[test]
    fn blocks_of_prim_size() {
        let mut c = AttributeContainer::new(8);
        assert_eq!(c.insert_lines::<2>(), 0);
        assert_eq!(c.insert_lines::<2>(), 2);
        c.remove_lines::<2>(3);
        assert!(!c.used(2) && !c.used(3));
        assert_eq!(c.holes(), &[2]);
        assert_eq!(c.next_primitive::<2>(0), 4);
        assert_eq!(c.insert_lines::<2>(), 2);
    }

    #[test]
    #[should_panic(expected = "not in use")]
    fn removing_free_line_panics() {
        let (mut c, _) = container_with(2);
        c.remove_lines::<1>(0);
        c.remove_lines::<1>(0);
    }

    #[test]
    fn refcount_baseline_is_one() {
        let (mut c, _) = container_with(1);
        assert_eq!(c.nb_refs(0), 1);
        c.ref_line(0);
        c.ref_line(0);
        assert_eq!(c.nb_refs(0), 3);
        assert!(!c.unref_line(0));
        assert!(c.used(0));
        assert!(c.unref_line(0));
        assert!(!c.used(0));
        assert_eq!(c.size(), 0);
        assert_eq!(c.holes(), &[0]);
    }

    #[test]
    #[should_panic(expected = "no external reference")]
    fn unref_at_baseline_panics() {
        let (mut c, _) = container_with(1);
        c.unref_line(0);
    }

    #[test]
    fn reverse_iteration_skips_holes() {
        let (mut c, _) = container_with(5);
        c.remove_lines::<1>(4);
        c.remove_lines::<1>(2);
        assert_eq!(c.rbegin(), 3);
        assert_eq!(c.rnext(3), 1);
        assert_eq!(c.rnext(0), c.rend());
        assert_eq!(c.lines().collect::<Vec<_>>(), vec![0, 1, 3]);
    }

    #[test]
    fn compaction_preserves_content_and_shrinks() {
        let (mut c, id) = container_with(10);
        for i in [1, 3, 4, 8] {
            c.remove_lines::<1>(i);
        }
        let survivors: Vec<u32> = c.lines().map(|i| c.typed::<u32>(id)[i]).collect();
        let map = c.compact::<1>();
        assert_eq!(c.size(), 6);
        assert_eq!(c.nb_max(), 6);
        assert!(c.holes().is_empty());
        assert_eq!(c.nb_chunks(), 2);
        for (old, &new) in map.iter().enumerate() {
            if [1, 3, 4, 8].contains(&old) {
                assert_eq!(new, INVALID_INDEX);
            } else {
                assert!(new < 6);
                assert_eq!(c.typed::<u32>(id)[new], old as u32 * 100);
            }
        }
        let mut after: Vec<u32> = c.lines().map(|i| c.typed::<u32>(id)[i]).collect();
        after.sort_unstable();
        let mut before = survivors;
        before.sort_unstable();
        assert_eq!(after, before);
        c.validate_invariants().unwrap();
    }

    #[test]
    fn compaction_without_holes_is_identity() {
        let (mut c, _) = container_with(3);
        assert_eq!(c.compact::<1>(), vec![0, 1, 2]);
    }

    #[test]
    fn duplicate_and_empty_names_are_rejected() {
        let mut c = AttributeContainer::new(4);
        assert!(c.add_attribute::<f32>("").is_none());
        assert!(c.add_attribute::<f32>("x").is_some());
        assert!(c.add_attribute::<u8>("x").is_none());
        assert!(c.get_attribute::<u8>("x").is_none());
        assert!(c.get_attribute::<f32>("missing").is_none());
    }

    #[test]
    fn removed_attribute_id_goes_stale() {
        let mut c = AttributeContainer::new(4);
        let a = c.add_attribute::<f32>("a").unwrap();
        assert!(c.remove_attribute(a));
        assert!(!c.is_valid(a));
        let b = c.add_attribute::<f32>("b").unwrap();
        assert_ne!(a, b);
        assert!(c.array::<f32>(a).is_none());
        assert!(!c.remove_attribute(a));
    }

    #[test]
    fn swap_and_copy_data() {
        let (mut c, id) = container_with(3);
        let other = c.add_attribute::<u32>("other").unwrap();
        assert!(c.swap_data_attributes(id, other));
        assert_eq!(c.typed::<u32>(other)[2], 200);
        assert_eq!(c.typed::<u32>(id)[2], 0);
        assert!(c.copy_data_attribute(id, other));
        assert_eq!(c.typed::<u32>(id)[1], 100);
        let f = c.add_attribute::<f32>("f").unwrap();
        assert!(!c.swap_data_attributes(id, f));
    }

    #[test]
    fn persistent_markers_follow_lines() {
        let (mut c, _) = container_with(3);
        let m = c.add_marker_attribute();
        c.marker_mut(m)[2] = true;
        c.remove_lines::<1>(0);
        c.compact::<1>();
        assert!(c.marker(m)[0]);
        assert!(!c.marker(m)[1]);
    }

    #[test]
    fn inconsistent_stream_leaves_container_untouched() {
        let (src, _) = container_with(3);
        let mut buf = Vec::new();
        src.save(&mut buf).unwrap();
        // nb_used claims 2 lines while 3 carry references.
        buf[4..8].copy_from_slice(&2u32.to_le_bytes());

        let (mut c, id) = container_with(5);
        let err = c.load(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, MeshCmapError::ContainerMismatch(_)), "{err}");
        assert_eq!(c.size(), 5);
        assert_eq!(c.typed::<u32>(id)[4], 400);
    }

    #[test]
    fn load_replaces_content_and_stales_handles() {
        let (src, _) = container_with(3);
        let mut buf = Vec::new();
        src.save(&mut buf).unwrap();

        let (mut c, old) = container_with(5);
        c.add_marker_attribute();
        c.load(&mut buf.as_slice()).unwrap();
        assert_eq!(c.size(), 3);
        assert_eq!(c.attribute_names(), vec!["value"]);
        let id = c.get_attribute::<u32>("value").unwrap();
        assert_ne!(id, old);
        assert_eq!(c.typed::<u32>(id)[2], 200);
    }
}
