//! Scoped boolean markers over darts and cells.
//!
//! Markers are borrowed from a [`MarkerPool`] attached to one container
//! (the topology container for dart markers, an orbit container for cell
//! markers) and handed back when the guard is dropped, all marks cleared.
//! Each pool keeps one free list per worker slot so concurrent read-only
//! traversals running on distinct [`WorkerId`]s never contend; the shared
//! lock is only taken when a brand-new array has to be allocated.
//!
//! - [`DartMarker`] clears its whole array on release.
//! - [`DartMarkerStore`] records what it marked and clears only that; its
//!   [`marked_darts`](DartMarkerStore::marked_darts) doubles as a worklist.
//! - [`CellMarker`] marks embedding lines of an embedded orbit.

use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::data::chunk_array::ChunkArray;
use crate::topology::cell::Cell;
use crate::topology::dart::Dart;
use crate::topology::map_base::MapBase;

/// Worker slot used to pick a marker free list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub usize);

impl WorkerId {
    /// Slot used by every traversal not explicitly scoped.
    pub const MAIN: WorkerId = WorkerId(0);
}

/// Per-container pool of reusable boolean arrays.
#[derive(Debug)]
pub struct MarkerPool {
    chunk_size: usize,
    free: Vec<Mutex<Vec<ChunkArray<bool>>>>,
    // number of arrays ever created; guarded so creation is serialised
    mark_attributes: Mutex<usize>,
}

impl MarkerPool {
    pub fn new(chunk_size: usize, nb_workers: usize) -> Self {
        Self {
            chunk_size,
            free: (0..nb_workers.max(1)).map(|_| Mutex::new(Vec::new())).collect(),
            mark_attributes: Mutex::new(0),
        }
    }

    pub fn nb_workers(&self) -> usize {
        self.free.len()
    }

    /// Arrays allocated over the pool's lifetime.
    pub fn nb_created(&self) -> usize {
        *self.mark_attributes.lock()
    }

    fn slot(&self, worker: WorkerId) -> &Mutex<Vec<ChunkArray<bool>>> {
        assert!(
            worker.0 < self.free.len(),
            "worker {} out of range ({} slots)",
            worker.0,
            self.free.len()
        );
        &self.free[worker.0]
    }

    /// All-false array with at least `nb_chunks` chunks.
    pub fn acquire(&self, worker: WorkerId, nb_chunks: usize) -> ChunkArray<bool> {
        let recycled = self.slot(worker).lock().pop();
        let mut array = match recycled {
            Some(a) => a,
            None => {
                let mut created = self.mark_attributes.lock();
                *created += 1;
                ChunkArray::new(self.chunk_size)
            }
        };
        if array.nb_chunks() < nb_chunks {
            array.set_nb_chunks(nb_chunks);
        }
        array
    }

    /// Return an array. It must be all-false.
    pub fn release(&self, worker: WorkerId, array: ChunkArray<bool>) {
        self.slot(worker).lock().push(array);
    }
}

fn grow_to(array: &mut ChunkArray<bool>, index: u32) {
    while index as usize >= array.capacity() {
        array.add_chunk();
    }
}

#[inline]
fn is_set(array: &ChunkArray<bool>, index: u32) -> bool {
    (index as usize) < array.capacity() && array[index]
}

/// Marks arbitrary darts; unmarks everything when dropped.
pub struct DartMarker {
    pool: Arc<MarkerPool>,
    worker: WorkerId,
    array: Option<ChunkArray<bool>>,
}

impl DartMarker {
    pub fn new(pool: Arc<MarkerPool>, worker: WorkerId, nb_chunks: usize) -> Self {
        let array = pool.acquire(worker, nb_chunks);
        Self {
            pool,
            worker,
            array: Some(array),
        }
    }

    fn array(&self) -> &ChunkArray<bool> {
        match &self.array {
            Some(a) => a,
            None => unreachable!("marker array is only taken on drop"),
        }
    }

    fn array_mut(&mut self) -> &mut ChunkArray<bool> {
        match &mut self.array {
            Some(a) => a,
            None => unreachable!("marker array is only taken on drop"),
        }
    }

    #[inline]
    pub fn mark(&mut self, d: Dart) {
        let a = self.array_mut();
        grow_to(a, d.index());
        a[d.index()] = true;
    }

    #[inline]
    pub fn unmark(&mut self, d: Dart) {
        let a = self.array_mut();
        if (d.index() as usize) < a.capacity() {
            a[d.index()] = false;
        }
    }

    #[inline]
    pub fn is_marked(&self, d: Dart) -> bool {
        is_set(self.array(), d.index())
    }

    pub fn unmark_all(&mut self) {
        self.array_mut().fill(false);
    }
}

impl Drop for DartMarker {
    fn drop(&mut self) {
        if let Some(mut a) = self.array.take() {
            a.fill(false);
            self.pool.release(self.worker, a);
        }
    }
}

/// Marks darts and remembers them; only the recorded darts are cleared.
pub struct DartMarkerStore {
    inner: DartMarker,
    marked: Vec<Dart>,
}

impl DartMarkerStore {
    pub fn new(pool: Arc<MarkerPool>, worker: WorkerId, nb_chunks: usize) -> Self {
        Self {
            inner: DartMarker::new(pool, worker, nb_chunks),
            marked: Vec::new(),
        }
    }

    /// Mark `d`; a dart already marked is not recorded twice.
    #[inline]
    pub fn mark(&mut self, d: Dart) {
        if !self.inner.is_marked(d) {
            self.inner.mark(d);
            self.marked.push(d);
        }
    }

    #[inline]
    pub fn is_marked(&self, d: Dart) -> bool {
        self.inner.is_marked(d)
    }

    /// Darts marked so far, in marking order.
    pub fn marked_darts(&self) -> &[Dart] {
        &self.marked
    }

    pub fn unmark_all(&mut self) {
        for d in self.marked.drain(..) {
            self.inner.unmark(d);
        }
    }
}

impl Drop for DartMarkerStore {
    fn drop(&mut self) {
        for &d in &self.marked {
            self.inner.unmark(d);
        }
        // already clean: release without the full clear of DartMarker::drop
        if let Some(a) = self.inner.array.take() {
            self.inner.pool.release(self.inner.worker, a);
        }
    }
}

/// Marks cells of an embedded orbit through their embedding line.
pub struct CellMarker<'a, C: Cell> {
    map: &'a MapBase,
    inner: DartMarkerStore,
    _cell: PhantomData<C>,
}

impl<'a, C: Cell> CellMarker<'a, C> {
    /// # Panics
    /// Panics if `C`'s orbit is not embedded in `map`.
    pub fn new(map: &'a MapBase, worker: WorkerId) -> Self {
        assert!(
            map.is_embedded(C::ORBIT),
            "CellMarker needs orbit {} to be embedded",
            C::ORBIT
        );
        let container = map.attribute_container(C::ORBIT);
        Self {
            map,
            inner: DartMarkerStore::new(
                map.cell_marker_pool(C::ORBIT),
                worker,
                container.nb_chunks(),
            ),
            _cell: PhantomData,
        }
    }

    #[inline]
    fn line(&self, c: C) -> Dart {
        let emb = self.map.embedding(C::ORBIT, c.dart());
        assert!(
            emb != crate::data::container::INVALID_INDEX,
            "cell {c:?} is not embedded"
        );
        Dart::new(emb)
    }

    /// # Panics
    /// Panics if the dart of `c` has no line yet.
    pub fn mark(&mut self, c: C) {
        let line = self.line(c);
        self.inner.mark(line);
    }

    pub fn is_marked(&self, c: C) -> bool {
        self.inner.is_marked(self.line(c))
    }

    pub fn unmark_all(&mut self) {
        self.inner.unmark_all();
    }
}
