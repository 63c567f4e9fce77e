//! Orbit traversal engine.
//!
//! [`Traversal`] is implemented for every map (on [`WorkerId::MAIN`]) and for
//! [`Scoped`] views (on an explicit worker slot). All cell-level services are
//! derived from a single primitive, [`Traversal::foreach_dart_of_orbit_until`],
//! which visits each dart of an orbit exactly once:
//!
//! | orbit | strategy |
//! |---|---|
//! | `Dart` | the dart itself |
//! | `Phi1` | phi1 cycle |
//! | `Phi2` | `d`, then `phi2(d)` unless it is a fixed point |
//! | `Phi21` | `it = phi2(phi_1(it))` until back at `d` |
//! | `Phi2Phi3` | alternate phi2 / phi3 until back at `d` (closed maps) |
//! | `Phi1Phi3` | phi1 cycle, each dart followed by its phi3 image |
//! | `Phi1Phi2` | face worklist, marker-guarded |
//! | `Phi1Phi2Phi3` | face worklist also crossing phi3 |
//! | `Phi21Phi31` | marker-store worklist on `phi2∘phi_1` and `phi3∘phi_1` |
//!
//! The `_until` variants stop as soon as the callback returns `false` and
//! report whether the traversal ran to completion. Markers acquired by a
//! traversal are released on every exit path.

use hashbrown::HashMap;

use crate::data::container::INVALID_INDEX;
use crate::mesh_error::MeshCmapError;
use crate::topology::cell::Cell;
use crate::topology::dart::Dart;
use crate::topology::incidence::{Adjacent, Incident};
use crate::topology::map::{Scoped, Topology};
use crate::topology::marker::{CellMarker, DartMarker, DartMarkerStore, WorkerId};
use crate::topology::orbit::Orbit;

/// How `foreach_cell` deduplicates darts of the same cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum TraversalStrategy {
    /// Cell marking when every dart of the orbit has a line, dart marking
    /// otherwise.
    #[default]
    Auto,
    /// Mark every dart of each visited cell.
    DartMarking,
    /// Mark the embedding line of each visited cell. Panics on a dart
    /// without a line.
    CellMarking,
}

pub trait Traversal: Sized {
    type Map: Topology;

    fn map(&self) -> &Self::Map;
    fn worker(&self) -> WorkerId;

    // ---------------------------------------------------------------------
    // Markers
    // ---------------------------------------------------------------------

    fn dart_marker(&self) -> DartMarker {
        let base = self.map().base();
        DartMarker::new(
            base.dart_marker_pool(),
            self.worker(),
            base.topology().nb_chunks(),
        )
    }

    fn dart_marker_store(&self) -> DartMarkerStore {
        let base = self.map().base();
        DartMarkerStore::new(
            base.dart_marker_pool(),
            self.worker(),
            base.topology().nb_chunks(),
        )
    }

    fn cell_marker<C: Cell>(&self) -> CellMarker<'_, C> {
        CellMarker::new(self.map().base(), self.worker())
    }

    /// Mark every dart of the orbit of `d`.
    fn mark_orbit(&self, marker: &mut DartMarker, orbit: Orbit, d: Dart) {
        self.foreach_dart_of_orbit(orbit, d, |e| marker.mark(e));
    }

    // ---------------------------------------------------------------------
    // Orbits
    // ---------------------------------------------------------------------

    /// Visit each dart of the orbit of `d` once, stopping when `f` returns
    /// `false`. Returns `true` if every dart was visited.
    ///
    /// # Panics
    /// Panics if the map dimension does not support `orbit`.
    fn foreach_dart_of_orbit_until<F: FnMut(Dart) -> bool>(
        &self,
        orbit: Orbit,
        d: Dart,
        mut f: F,
    ) -> bool {
        let m = self.map();
        if !<Self::Map as Topology>::supports(orbit) {
            panic!(
                "orbit {orbit} is not supported by a {}-map",
                <Self::Map as Topology>::DIMENSION
            );
        }
        match orbit {
            Orbit::Dart => f(d),
            Orbit::Phi1 => phi1_cycle(m, d, &mut f),
            Orbit::Phi2 => {
                if !f(d) {
                    return false;
                }
                let e = m.phi2(d);
                e == d || f(e)
            }
            Orbit::Phi21 => {
                let mut it = d;
                loop {
                    if !f(it) {
                        return false;
                    }
                    it = m.phi2(m.phi_1(it));
                    if it == d {
                        return true;
                    }
                }
            }
            Orbit::Phi2Phi3 => {
                debug_assert!(m.phi2(d) != d, "PHI2_PHI3 orbit needs a closed map");
                let mut it = d;
                loop {
                    if !f(it) {
                        return false;
                    }
                    it = m.phi2(it);
                    if !f(it) {
                        return false;
                    }
                    it = m.phi3(it);
                    if it == d {
                        return true;
                    }
                }
            }
            Orbit::Phi1Phi3 => phi1_cycle(m, d, &mut |fd| {
                if !f(fd) {
                    return false;
                }
                let fd3 = m.phi3(fd);
                fd3 == fd || f(fd3)
            }),
            Orbit::Phi1Phi2 => face_worklist(self, d, false, &mut f),
            Orbit::Phi1Phi2Phi3 => face_worklist(self, d, true, &mut f),
            Orbit::Phi21Phi31 => {
                let mut marker = self.dart_marker_store();
                marker.mark(d);
                let mut i = 0;
                while i < marker.marked_darts().len() {
                    let cur = marker.marked_darts()[i];
                    if !f(cur) {
                        return false;
                    }
                    let d_1 = m.phi_1(cur);
                    marker.mark(m.phi2(d_1));
                    marker.mark(m.phi3(d_1));
                    i += 1;
                }
                true
            }
        }
    }

    fn foreach_dart_of_orbit<F: FnMut(Dart)>(&self, orbit: Orbit, d: Dart, mut f: F) {
        self.foreach_dart_of_orbit_until(orbit, d, |e| {
            f(e);
            true
        });
    }

    fn foreach_dart_of<C: Cell, F: FnMut(Dart)>(&self, c: C, f: F) {
        self.foreach_dart_of_orbit(C::ORBIT, c.dart(), f);
    }

    fn foreach_dart_of_until<C: Cell, F: FnMut(Dart) -> bool>(&self, c: C, f: F) -> bool {
        self.foreach_dart_of_orbit_until(C::ORBIT, c.dart(), f)
    }

    /// Darts of `c` in visiting order.
    fn orbit_darts<C: Cell>(&self, c: C) -> Vec<Dart> {
        let mut out = Vec::new();
        self.foreach_dart_of(c, |d| out.push(d));
        out
    }

    fn nb_darts_of<C: Cell>(&self, c: C) -> usize {
        let mut n = 0;
        self.foreach_dart_of(c, |_| n += 1);
        n
    }

    /// Whether `a` and `b` are the same cell (O(orbit size)).
    fn same_cell<C: Cell>(&self, a: C, b: C) -> bool {
        let target = b.dart();
        !self.foreach_dart_of_until(a, |d| d != target)
    }

    // ---------------------------------------------------------------------
    // Darts and cells of the whole map
    // ---------------------------------------------------------------------

    fn nb_darts(&self) -> usize {
        self.map().base().nb_darts()
    }

    fn foreach_dart_until<F: FnMut(Dart) -> bool>(&self, mut f: F) -> bool {
        self.map().base().darts().all(|d| f(d))
    }

    fn foreach_dart<F: FnMut(Dart)>(&self, f: F) {
        self.map().base().darts().for_each(f);
    }

    fn foreach_cell_with_until<C: Cell, F: FnMut(C) -> bool>(
        &self,
        strategy: TraversalStrategy,
        mut f: F,
    ) -> bool {
        let base = self.map().base();
        let strategy = match strategy {
            TraversalStrategy::Auto if base.is_fully_embedded(C::ORBIT) => {
                TraversalStrategy::CellMarking
            }
            TraversalStrategy::Auto => TraversalStrategy::DartMarking,
            s => s,
        };
        if C::ORBIT == Orbit::Dart {
            return base.darts().all(|d| f(C::from_dart(d)));
        }
        match strategy {
            TraversalStrategy::CellMarking => {
                let mut marker = self.cell_marker::<C>();
                for d in base.darts() {
                    let c = C::from_dart(d);
                    if marker.is_marked(c) {
                        continue;
                    }
                    marker.mark(c);
                    if !f(c) {
                        return false;
                    }
                }
                true
            }
            _ => {
                let mut marker = self.dart_marker();
                for d in base.darts() {
                    if marker.is_marked(d) {
                        continue;
                    }
                    self.mark_orbit(&mut marker, C::ORBIT, d);
                    if !f(C::from_dart(d)) {
                        return false;
                    }
                }
                true
            }
        }
    }

    /// Visit one representative of each `C` cell until `f` returns `false`.
    fn foreach_cell_until<C: Cell, F: FnMut(C) -> bool>(&self, f: F) -> bool {
        self.foreach_cell_with_until(TraversalStrategy::Auto, f)
    }

    fn foreach_cell<C: Cell, F: FnMut(C)>(&self, mut f: F) {
        self.foreach_cell_until(|c| {
            f(c);
            true
        });
    }

    fn foreach_cell_with<C: Cell, F: FnMut(C)>(&self, strategy: TraversalStrategy, mut f: F) {
        self.foreach_cell_with_until(strategy, |c| {
            f(c);
            true
        });
    }

    fn cells<C: Cell>(&self) -> Vec<C> {
        let mut out = Vec::new();
        self.foreach_cell(|c| out.push(c));
        out
    }

    fn nb_cells<C: Cell>(&self) -> usize {
        let mut n = 0;
        self.foreach_cell::<C, _>(|_| n += 1);
        n
    }

    // ---------------------------------------------------------------------
    // Incidence and adjacency
    // ---------------------------------------------------------------------

    /// Visit the `To` cells incident to `c`.
    fn foreach_incident<Of: Cell, To: Cell, F: FnMut(To)>(&self, c: Of, mut f: F)
    where
        Self: Incident<Of, To>,
    {
        Incident::<Of, To>::foreach_incident_until(self, c, |x| {
            f(x);
            true
        });
    }

    fn incident<Of: Cell, To: Cell>(&self, c: Of) -> Vec<To>
    where
        Self: Incident<Of, To>,
    {
        let mut out = Vec::new();
        self.foreach_incident(c, |x: To| out.push(x));
        out
    }

    /// Visit the `C` cells sharing a `Through` cell with `c`.
    fn foreach_adjacent<C: Cell, Through: Cell, F: FnMut(C)>(&self, c: C, mut f: F)
    where
        Self: Adjacent<C, Through>,
    {
        Adjacent::<C, Through>::foreach_adjacent_until(self, c, |x| {
            f(x);
            true
        });
    }

    fn adjacent<C: Cell, Through: Cell>(&self, c: C) -> Vec<C>
    where
        Self: Adjacent<C, Through>,
    {
        let mut out = Vec::new();
        self.foreach_adjacent::<C, Through, _>(c, |x| out.push(x));
        out
    }

    // ---------------------------------------------------------------------
    // Integrity
    // ---------------------------------------------------------------------

    /// Every dart of each `C` cell shares one valid line, distinct cells use
    /// distinct lines, and each line's count is its number of darts plus one.
    fn is_well_embedded<C: Cell>(&self) -> bool {
        self.check_orbit_embedding(C::ORBIT).is_ok()
    }

    fn check_orbit_embedding(&self, orbit: Orbit) -> Result<(), MeshCmapError> {
        let base = self.map().base();
        if !base.is_embedded(orbit) {
            log::warn!("check_orbit_embedding: orbit {orbit} is not embedded");
            return Err(MeshCmapError::BadEmbedding(orbit));
        }
        let container = base.attribute_container(orbit);
        let mut owners: HashMap<u32, Dart> = HashMap::new();
        let mut marker = self.dart_marker();
        for d in base.darts() {
            if marker.is_marked(d) {
                continue;
            }
            let emb = base.embedding(orbit, d);
            if emb == INVALID_INDEX {
                log::warn!("{orbit}: dart {d} is not embedded");
                return Err(MeshCmapError::BadEmbedding(orbit));
            }
            let mut nb = 0u32;
            let uniform = self.foreach_dart_of_orbit_until(orbit, d, |e| {
                marker.mark(e);
                nb += 1;
                base.embedding(orbit, e) == emb
            });
            if !uniform {
                log::warn!("{orbit}: darts of the cell of {d} disagree on their embedding");
                return Err(MeshCmapError::BadEmbedding(orbit));
            }
            if let Some(other) = owners.insert(emb, d) {
                log::warn!("{orbit}: cells of {other} and {d} share line {emb}");
                return Err(MeshCmapError::BadEmbedding(orbit));
            }
            if container.nb_refs(emb) != nb + 1 {
                log::warn!(
                    "{orbit}: line {emb} has {} refs for {nb} darts",
                    container.nb_refs(emb)
                );
                return Err(MeshCmapError::BadEmbedding(orbit));
            }
        }
        if container.size() as usize != owners.len() {
            log::warn!(
                "{orbit}: {} lines in use for {} cells",
                container.size(),
                owners.len()
            );
            return Err(MeshCmapError::BadEmbedding(orbit));
        }
        Ok(())
    }

    /// Check every embedded orbit.
    fn check_embedding_integrity(&self) -> bool {
        Orbit::ALL
            .into_iter()
            .filter(|o| self.map().base().is_embedded(*o))
            .all(|o| self.check_orbit_embedding(o).is_ok())
    }

    /// First relation or boundary violation, if any.
    fn check_topology(&self) -> Result<(), MeshCmapError> {
        let m = self.map();
        for d in m.base().darts() {
            if !m.check_dart_integrity(d) {
                log::warn!("integrity check failed at dart {d}");
                return Err(MeshCmapError::BrokenRelation(d));
            }
            if !m.check_boundary_integrity(d) {
                log::warn!("boundary check failed at dart {d}");
                return Err(MeshCmapError::BrokenBoundary(d));
            }
        }
        Ok(())
    }

    /// Relations, boundary marks and embeddings are all consistent.
    fn check_map_integrity(&self) -> bool {
        self.check_topology().is_ok() && self.check_embedding_integrity()
    }
}

impl<M: Topology> Traversal for M {
    type Map = M;

    #[inline]
    fn map(&self) -> &M {
        self
    }

    #[inline]
    fn worker(&self) -> WorkerId {
        WorkerId::MAIN
    }
}

impl<'a, M: Topology> Traversal for Scoped<'a, M> {
    type Map = M;

    #[inline]
    fn map(&self) -> &M {
        self.inner()
    }

    #[inline]
    fn worker(&self) -> WorkerId {
        self.worker_id()
    }
}

fn phi1_cycle<M: Topology, F: FnMut(Dart) -> bool>(m: &M, d: Dart, f: &mut F) -> bool {
    let mut it = d;
    loop {
        if !f(it) {
            return false;
        }
        it = m.phi1(it);
        if it == d {
            return true;
        }
    }
}

// Faces are visited whole: a popped unmarked dart has an unmarked face.
fn face_worklist<T: Traversal, F: FnMut(Dart) -> bool>(
    t: &T,
    d: Dart,
    through_phi3: bool,
    f: &mut F,
) -> bool {
    let m = t.map();
    let mut marker = t.dart_marker_store();
    let mut faces = vec![d];
    let mut i = 0;
    while i < faces.len() {
        let e = faces[i];
        i += 1;
        if marker.is_marked(e) {
            continue;
        }
        let mut it = e;
        loop {
            if !f(it) {
                return false;
            }
            marker.mark(it);
            let adj = m.phi2(it);
            if !marker.is_marked(adj) {
                faces.push(adj);
            }
            it = m.phi1(it);
            if it == e {
                break;
            }
        }
        if through_phi3 {
            faces.push(m.phi3(e));
        }
    }
    true
}
