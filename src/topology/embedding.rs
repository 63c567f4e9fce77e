//! Cell embeddings and typed cell attributes.
//!
//! An orbit is *embedded* once it has an `EMB_<ORBIT>` dart array; every dart
//! of a cell then carries the index of the cell's line in the orbit's
//! container. Attributes over cells live in that container and are reached
//! through an [`Attribute`] handle.
//!
//! ```ignore
//! let pos = map.add_attribute::<[f64; 3], Vertex>("position").unwrap();
//! map.set_attribute(&pos, v, [0.0, 1.0, 0.0]);
//! assert_eq!(map.attribute(&pos, v)[1], 1.0);
//! ```

use std::fmt;
use std::marker::PhantomData;

use crate::data::container::{AttributeId, INVALID_INDEX};
use crate::data::value::AttributeValue;
use crate::topology::cell::Cell;
use crate::topology::dart::Dart;
use crate::topology::map::Topology;
use crate::topology::orbit::Orbit;
use crate::topology::traversal::{Traversal, TraversalStrategy};

/// Typed handle on an attribute of the `C` cells.
pub struct Attribute<T, C> {
    id: AttributeId,
    _marker: PhantomData<fn() -> (T, C)>,
}

impl<T, C> Attribute<T, C> {
    fn new(id: AttributeId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> AttributeId {
        self.id
    }
}

impl<T, C> Clone for Attribute<T, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, C> Copy for Attribute<T, C> {}

impl<T, C> PartialEq for Attribute<T, C> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T, C> Eq for Attribute<T, C> {}

impl<T, C> fmt::Debug for Attribute<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Attribute").field(&self.id).finish()
    }
}

/// Embedding and attribute services, available on every map.
pub trait Embedding: Topology {
    fn is_embedded<C: Cell>(&self) -> bool {
        self.base().is_embedded(C::ORBIT)
    }

    /// Line of `c` in its orbit container, `INVALID_INDEX` if unset.
    ///
    /// # Panics
    /// Panics if `C`'s orbit is not embedded.
    fn embedding<C: Cell>(&self, c: C) -> u32 {
        self.base().embedding(C::ORBIT, c.dart())
    }

    /// Create the embedding of `C` and give every existing cell a fresh line.
    /// No-op if already embedded.
    fn create_embedding<C: Cell>(&mut self) {
        self.create_orbit_embedding(C::ORBIT);
    }

    fn create_orbit_embedding(&mut self, orbit: Orbit) {
        if self.base().is_embedded(orbit) {
            return;
        }
        self.base_mut().create_embedding(orbit);
        let mut reps = Vec::new();
        {
            let mut marker = self.dart_marker();
            for d in self.base().darts() {
                if !marker.is_marked(d) {
                    self.mark_orbit(&mut marker, orbit, d);
                    reps.push(d);
                }
            }
        }
        for d in reps {
            self.new_orbit_embedding_of(orbit, d);
        }
        log::debug!(
            "embedded orbit {orbit}: {} cells",
            self.base().attribute_container(orbit).size()
        );
    }

    /// Point one dart at `emb`, moving its reference from the old line.
    fn set_embedding<C: Cell>(&mut self, d: Dart, emb: u32) {
        self.base_mut().set_embedding(C::ORBIT, d, emb);
    }

    /// Like [`set_embedding`](Self::set_embedding) for an unembedded dart.
    fn init_embedding<C: Cell>(&mut self, d: Dart, emb: u32) {
        self.base_mut().init_embedding(C::ORBIT, d, emb);
    }

    /// Give `dst` the `C` embedding of `src`.
    fn copy_embedding<C: Cell>(&mut self, dst: Dart, src: Dart) {
        let emb = self.base().embedding(C::ORBIT, src);
        self.base_mut().set_embedding(C::ORBIT, dst, emb);
    }

    fn set_orbit_embedding<C: Cell>(&mut self, c: C, emb: u32) {
        self.set_orbit_embedding_of(C::ORBIT, c.dart(), emb);
    }

    fn set_orbit_embedding_of(&mut self, orbit: Orbit, d: Dart, emb: u32) {
        let mut darts = Vec::new();
        self.foreach_dart_of_orbit(orbit, d, |e| darts.push(e));
        for e in darts {
            self.base_mut().set_embedding(orbit, e, emb);
        }
    }

    fn init_orbit_embedding<C: Cell>(&mut self, c: C, emb: u32) {
        let mut darts = Vec::new();
        self.foreach_dart_of(c, |e| darts.push(e));
        for e in darts {
            self.base_mut().init_embedding(C::ORBIT, e, emb);
        }
    }

    /// Allocate a line for `c` and point every dart of `c` at it.
    fn new_orbit_embedding<C: Cell>(&mut self, c: C) -> u32 {
        self.new_orbit_embedding_of(C::ORBIT, c.dart())
    }

    fn new_orbit_embedding_of(&mut self, orbit: Orbit, d: Dart) -> u32 {
        let line = self.base_mut().new_embedding_line(orbit);
        self.set_orbit_embedding_of(orbit, d, line);
        line
    }

    /// Give the orbit of `d` a fresh line in every embedded orbit of
    /// `orbits`.
    fn new_embeddings_of(&mut self, orbits: &[Orbit], d: Dart) {
        for &orbit in orbits {
            if self.base().is_embedded(orbit) {
                self.new_orbit_embedding_of(orbit, d);
            }
        }
    }

    /// Embed every cell of `orbit` whose darts are not all embedded yet.
    /// A cell with some embedded darts takes the line of the first one.
    fn complete_orbit_embedding(&mut self, orbit: Orbit) {
        if !self.base().is_embedded(orbit) {
            return;
        }
        let mut todo = Vec::new();
        {
            let mut marker = self.dart_marker();
            let base = self.base();
            for d in base.darts() {
                if marker.is_marked(d) {
                    continue;
                }
                let mut found = INVALID_INDEX;
                let mut complete = true;
                self.foreach_dart_of_orbit(orbit, d, |e| {
                    marker.mark(e);
                    let emb = base.embedding(orbit, e);
                    if emb == INVALID_INDEX {
                        complete = false;
                    } else if found == INVALID_INDEX {
                        found = emb;
                    }
                });
                if !complete {
                    todo.push((d, found));
                }
            }
        }
        for (d, emb) in todo {
            if emb == INVALID_INDEX {
                self.new_orbit_embedding_of(orbit, d);
            } else {
                self.set_orbit_embedding_of(orbit, d, emb);
            }
        }
    }

    /// [`complete_orbit_embedding`](Self::complete_orbit_embedding) for
    /// every embedded orbit.
    fn complete_embeddings(&mut self) {
        for orbit in Orbit::ALL {
            if Self::supports(orbit) {
                self.complete_orbit_embedding(orbit);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Attributes
    // ---------------------------------------------------------------------

    /// Add a `T` attribute over the `C` cells, embedding `C` first if needed.
    /// Returns `None` (with a warning) if the name is empty or taken.
    fn add_attribute<T: AttributeValue, C: Cell>(&mut self, name: &str) -> Option<Attribute<T, C>> {
        self.create_embedding::<C>();
        self.base_mut()
            .attribute_container_mut(C::ORBIT)
            .add_attribute::<T>(name)
            .map(Attribute::new)
    }

    fn get_attribute<T: AttributeValue, C: Cell>(&self, name: &str) -> Option<Attribute<T, C>> {
        self.base()
            .attribute_container(C::ORBIT)
            .get_attribute::<T>(name)
            .map(Attribute::new)
    }

    /// Drop an attribute; the handle (and its copies) become stale.
    fn remove_attribute<T: AttributeValue, C: Cell>(&mut self, h: Attribute<T, C>) -> bool {
        self.base_mut()
            .attribute_container_mut(C::ORBIT)
            .remove_attribute(h.id)
    }

    fn is_valid<T: AttributeValue, C: Cell>(&self, h: &Attribute<T, C>) -> bool {
        self.base()
            .attribute_container(C::ORBIT)
            .array::<T>(h.id)
            .is_some()
    }

    /// # Panics
    /// Panics if the handle was removed or `c` is not embedded.
    fn attribute<T: AttributeValue, C: Cell>(&self, h: &Attribute<T, C>, c: C) -> &T {
        let emb = self.embedding(c);
        &self.base().attribute_container(C::ORBIT).typed::<T>(h.id)[emb]
    }

    fn attribute_mut<T: AttributeValue, C: Cell>(&mut self, h: &Attribute<T, C>, c: C) -> &mut T {
        let emb = self.embedding(c);
        &mut self
            .base_mut()
            .attribute_container_mut(C::ORBIT)
            .typed_mut::<T>(h.id)[emb]
    }

    fn set_attribute<T: AttributeValue, C: Cell>(&mut self, h: &Attribute<T, C>, c: C, value: T) {
        *self.attribute_mut(h, c) = value;
    }

    /// Value of `c`, or `None` for a stale handle or an unembedded cell.
    fn try_attribute<T: AttributeValue, C: Cell>(&self, h: &Attribute<T, C>, c: C) -> Option<&T> {
        if !self.is_embedded::<C>() {
            return None;
        }
        let emb = self.embedding(c);
        if emb == INVALID_INDEX {
            return None;
        }
        self.base()
            .attribute_container(C::ORBIT)
            .array::<T>(h.id)
            .map(|a| &a[emb])
    }

    /// Visit every `(cell, value)` pair of an attribute.
    fn foreach_attribute<T: AttributeValue, C: Cell, F: FnMut(C, &T)>(
        &self,
        h: &Attribute<T, C>,
        mut f: F,
    ) {
        let values = self.base().attribute_container(C::ORBIT).typed::<T>(h.id);
        self.foreach_cell_with(TraversalStrategy::Auto, |c: C| {
            f(c, &values[self.embedding(c)]);
        });
    }
}

impl<M: Topology> Embedding for M {}
