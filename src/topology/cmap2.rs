//! 2-dimensional combinatorial maps (oriented surfaces).
//!
//! phi2 glues the two sides of an edge. A closed 2-map has no phi2 fixed
//! point: the holes of the surface are filled by faces whose darts are
//! marked as boundary. Boundary faces are ordinary cycles for traversal
//! purposes but are never reported by incidence queries.

use crate::config::MapConfig;
use crate::data::container::{AttributeId, INVALID_INDEX};
use crate::debug_invariants::DebugInvariants;
use crate::define_cell;
use crate::mesh_error::MeshCmapError;
use crate::topology::cell::Cell;
use crate::topology::cmap1::CMap1;
use crate::topology::dart::Dart;
use crate::topology::embedding::Embedding;
use crate::topology::incidence::{Codegree, Degree, Incident, impl_adjacent, impl_incident};
use crate::topology::map::Topology;
use crate::topology::map_base::MapBase;
use crate::topology::orbit::Orbit;
use crate::topology::traversal::Traversal;

define_cell!(
    /// Darts around a vertex: `phi2 ∘ phi_1` cycle.
    Vertex => Orbit::Phi21
);
define_cell!(
    /// The (at most) two darts of an edge.
    Edge => Orbit::Phi2
);
define_cell!(Face => Orbit::Phi1);
define_cell!(
    /// A connected surface.
    Volume => Orbit::Phi1Phi2
);

pub struct CMap2 {
    map1: CMap1,
    phi2: AttributeId,
}

impl std::fmt::Debug for CMap2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CMap2").field("base", self.base()).finish()
    }
}

impl Default for CMap2 {
    fn default() -> Self {
        Self::new()
    }
}

impl CMap2 {
    pub fn new() -> Self {
        Self::with_config(MapConfig::default())
    }

    pub fn with_config(config: MapConfig) -> Self {
        let mut map1 = CMap1::with_config(config);
        let phi2 = map1.base_mut().add_relation("phi2");
        Self { map1, phi2 }
    }

    /// The underlying 1-map (phi1 only).
    pub fn map1(&self) -> &CMap1 {
        &self.map1
    }

    pub(crate) fn map1_mut(&mut self) -> &mut CMap1 {
        &mut self.map1
    }

    // ---------------------------------------------------------------------
    // Low-level operations (embeddings are not updated)
    // ---------------------------------------------------------------------

    /// Link two phi2 fixed points.
    ///
    /// # Panics
    /// Panics if `d` or `e` is already linked.
    pub fn phi2_sew(&mut self, d: Dart, e: Dart) {
        assert!(self.phi2(d) == d, "phi2_sew: {d:?} is already sewn");
        assert!(self.phi2(e) == e, "phi2_sew: {e:?} is already sewn");
        let phi2 = self.map1.base_mut().relation_mut(self.phi2);
        phi2[d.index()] = e;
        phi2[e.index()] = d;
    }

    /// Make `d` and its partner phi2 fixed points.
    pub fn phi2_unsew(&mut self, d: Dart) {
        let e = self.phi2(d);
        let phi2 = self.map1.base_mut().relation_mut(self.phi2);
        phi2[d.index()] = d;
        phi2[e.index()] = e;
    }

    pub(crate) fn set_boundary(&mut self, d: Dart, b: bool) {
        self.map1.base_mut().set_boundary(d, b);
    }

    /// Mark or unmark every dart of the phi1 cycle of `d`.
    pub(crate) fn set_face_boundary(&mut self, d: Dart, b: bool) {
        for e in self.orbit_darts(Face(d)) {
            self.set_boundary(e, b);
        }
    }

    // ---------------------------------------------------------------------
    // Topological operations
    // ---------------------------------------------------------------------

    /// Face of `size` darts sewn to a boundary face of the same size.
    /// Returns a dart of the inner face.
    ///
    /// # Panics
    /// Panics if `size == 0`.
    pub fn add_face_topo(&mut self, size: usize) -> Dart {
        let d = self.map1.add_face_topo(size);
        let mut e = self.map1.add_face_topo(size);
        for it in self.orbit_darts(Face(d)) {
            self.set_boundary(e, true);
            self.phi2_sew(it, e);
            e = self.phi_1(e);
        }
        d
    }

    /// Cut the edge of `d` on both sides; returns the new dart following `d`.
    /// On a phi2 fixed point only the face of `d` is cut.
    pub fn cut_edge_topo(&mut self, d: Dart) -> Dart {
        let e = self.phi2(d);
        if e == d {
            let nd = self.map1.cut_edge_topo(d);
            let b = self.is_boundary(d);
            self.set_boundary(nd, b);
            return nd;
        }
        self.phi2_unsew(d);
        let nd = self.map1.cut_edge_topo(d);
        let ne = self.map1.cut_edge_topo(e);
        self.phi2_sew(d, ne);
        self.phi2_sew(e, nd);
        let (bd, be) = (self.is_boundary(d), self.is_boundary(e));
        self.set_boundary(nd, bd);
        self.set_boundary(ne, be);
        nd
    }

    /// Split the face of `d` and `e` by a new edge joining the origins of
    /// `d` and `e`; returns the new dart preceding `d`.
    ///
    /// # Panics
    /// Panics if `d == e`; `d` and `e` must share a face.
    pub fn cut_face_topo(&mut self, d: Dart, e: Dart) -> Dart {
        assert!(d != e, "cut_face_topo needs two distinct darts");
        debug_assert!(self.same_cell(Face(d), Face(e)), "cut_face_topo: darts of distinct faces");
        let dd = self.phi_1(d);
        let ee = self.phi_1(e);
        let nd = self.map1.cut_edge_topo(dd);
        let ne = self.map1.cut_edge_topo(ee);
        self.map1.phi1_sew(dd, ee);
        self.phi2_sew(nd, ne);
        let (bd, be) = (self.is_boundary(dd), self.is_boundary(ee));
        self.set_boundary(nd, bd);
        self.set_boundary(ne, be);
        nd
    }

    /// Contract the edge of `d`, merging its two vertices. Both incident
    /// faces lose one dart. Returns a dart of the merged vertex.
    ///
    /// # Panics
    /// Panics if a face incident to the edge has a single dart.
    pub fn collapse_edge_topo(&mut self, d: Dart) -> Dart {
        let e = self.phi2(d);
        assert!(self.phi1(d) != d, "collapse_edge_topo: degenerate face at {d:?}");
        assert!(self.phi1(e) != e, "collapse_edge_topo: degenerate face at {e:?}");
        let res = if self.phi1(d) != e { self.phi1(d) } else { self.phi1(e) };
        self.map1.collapse_edge_topo(d);
        if e != d {
            self.map1.collapse_edge_topo(e);
        }
        res
    }

    /// Face filling the phi2 hole that contains `d`. Returns the dart of
    /// the new face sewn to `d`. Boundary marks are left to the caller.
    ///
    /// # Panics
    /// Panics if `d` is not a phi2 fixed point.
    pub fn close_hole_topo(&mut self, d: Dart) -> Dart {
        assert!(self.phi2(d) == d, "close_hole_topo: {d:?} is not a phi2 fixed point");
        let first = self.map1.add_dart();
        self.phi2_sew(d, first);
        let mut d_next = d;
        loop {
            let mut d_phi1;
            loop {
                d_phi1 = self.phi1(d_next);
                d_next = self.phi2(d_phi1);
                if d_next == d_phi1 || d_phi1 == d {
                    break;
                }
            }
            if d_phi1 == d {
                break;
            }
            let next = self.map1.add_dart();
            self.map1.phi1_sew(first, next);
            self.phi2_sew(d_next, next);
        }
        first
    }

    // ---------------------------------------------------------------------
    // Embedded operations
    // ---------------------------------------------------------------------

    /// [`add_face_topo`](Self::add_face_topo) plus fresh cells in every
    /// embedded orbit, the boundary face included.
    pub fn add_face(&mut self, size: usize) -> Face {
        let d = self.add_face_topo(size);
        for e in self.orbit_darts(Face(d)) {
            self.new_embeddings_of(&[Orbit::Dart, Orbit::Phi21, Orbit::Phi2], e);
            self.new_embeddings_of(&[Orbit::Dart], self.phi2(e));
        }
        self.new_embeddings_of(&[Orbit::Phi1], d);
        self.new_embeddings_of(&[Orbit::Phi1], self.phi2(d));
        self.new_embeddings_of(&[Orbit::Phi1Phi2], d);
        Face(d)
    }

    /// Cut `e`; returns the new vertex. The map must be closed.
    pub fn cut_edge(&mut self, e: Edge) -> Vertex {
        let d = e.dart();
        let d2 = self.phi2(d);
        assert!(d2 != d, "cut_edge: edge of {d:?} is not closed");
        let nd = self.cut_edge_topo(d);
        let ne = self.phi2(d);
        self.new_embeddings_of(&[Orbit::Dart], nd);
        self.new_embeddings_of(&[Orbit::Dart, Orbit::Phi21], ne);
        if self.base().is_embedded(Orbit::Phi2) {
            self.copy_embedding::<Edge>(ne, d);
            self.new_orbit_embedding(Edge(nd));
        }
        if self.base().is_embedded(Orbit::Phi1) {
            self.copy_embedding::<Face>(nd, d);
            self.copy_embedding::<Face>(ne, d2);
        }
        if self.base().is_embedded(Orbit::Phi1Phi2) {
            self.copy_embedding::<Volume>(nd, d);
            self.copy_embedding::<Volume>(ne, d);
        }
        Vertex(nd)
    }

    /// Split a face between the origins of `d` and `e`; returns the new edge.
    /// The face of `d` keeps its cell, the face of `e` gets a new one.
    pub fn cut_face(&mut self, d: Vertex, e: Vertex) -> Edge {
        let (d, e) = (d.dart(), e.dart());
        let nd = self.cut_face_topo(d, e);
        let ne = self.phi2(nd);
        self.new_embeddings_of(&[Orbit::Dart], nd);
        self.new_embeddings_of(&[Orbit::Dart], ne);
        if self.base().is_embedded(Orbit::Phi21) {
            self.copy_embedding::<Vertex>(nd, e);
            self.copy_embedding::<Vertex>(ne, d);
        }
        self.new_embeddings_of(&[Orbit::Phi2], nd);
        if self.base().is_embedded(Orbit::Phi1) {
            self.copy_embedding::<Face>(nd, d);
            self.new_orbit_embedding(Face(e));
        }
        if self.base().is_embedded(Orbit::Phi1Phi2) {
            self.copy_embedding::<Volume>(nd, d);
            self.copy_embedding::<Volume>(ne, d);
        }
        Edge(nd)
    }

    /// Contract `e`; the merged vertex keeps the cell of the origin of `e`.
    pub fn collapse_edge(&mut self, e: Edge) -> Vertex {
        let d = e.dart();
        let vemb = if self.base().is_embedded(Orbit::Phi21) {
            self.embedding(Vertex(d))
        } else {
            INVALID_INDEX
        };
        let res = self.collapse_edge_topo(d);
        if vemb != INVALID_INDEX {
            self.set_orbit_embedding(Vertex(res), vemb);
        }
        Vertex(res)
    }

    // ---------------------------------------------------------------------
    // Boundary and connectivity queries
    // ---------------------------------------------------------------------

    /// Whether some dart of `v` lies on the boundary.
    pub fn is_incident_to_boundary(&self, v: Vertex) -> bool {
        !self.foreach_dart_of_until(v, |d| !self.is_boundary(d))
    }

    /// Origin and destination of `e`.
    pub fn vertices(&self, e: Edge) -> (Vertex, Vertex) {
        (Vertex(e.dart()), Vertex(self.phi1(e.dart())))
    }
}

impl Topology for CMap2 {
    const DIMENSION: usize = 2;

    #[inline]
    fn base(&self) -> &MapBase {
        self.map1.base()
    }

    #[inline]
    fn base_mut(&mut self) -> &mut MapBase {
        self.map1.base_mut()
    }

    #[inline]
    fn phi1(&self, d: Dart) -> Dart {
        self.map1.phi1(d)
    }

    #[inline]
    fn phi_1(&self, d: Dart) -> Dart {
        self.map1.phi_1(d)
    }

    #[inline]
    fn phi2(&self, d: Dart) -> Dart {
        self.base().relation(self.phi2)[d.index()]
    }

    fn supports(orbit: Orbit) -> bool {
        matches!(
            orbit,
            Orbit::Dart | Orbit::Phi1 | Orbit::Phi2 | Orbit::Phi21 | Orbit::Phi1Phi2
        )
    }

    fn check_dart_integrity(&self, d: Dart) -> bool {
        self.map1.check_dart_integrity(d)
            && self.phi2(self.phi2(d)) == d
            && self.phi2(d) != d
    }

    fn check_boundary_integrity(&self, d: Dart) -> bool {
        self.is_boundary(d) == self.is_boundary(self.phi1(d))
            && (!self.is_boundary(d) || !self.is_boundary(self.phi2(d)))
    }

    fn refresh_handles(&mut self) -> Result<(), MeshCmapError> {
        self.map1.refresh_handles()?;
        self.phi2 = self
            .base()
            .relation_id("phi2")
            .ok_or_else(|| MeshCmapError::CorruptedContainer("relation `phi2` missing".into()))?;
        Ok(())
    }
}

impl_incident!(CMap2 {
    Vertex => Edge;
    Vertex => Face, skip_boundary;
    Vertex => Volume;
    Edge => Vertex;
    Edge => Face, skip_boundary;
    Edge => Volume;
    Face => Vertex;
    Face => Edge;
    Face => Volume;
    Volume => Vertex;
    Volume => Edge;
    Volume => Face, skip_boundary;
});

impl_adjacent!(CMap2 {
    Vertex => Edge;
    Vertex => Face;
    Edge => Vertex;
    Edge => Face;
    Face => Vertex;
    Face => Edge;
});

fn count<T, Of, To>(t: &T, c: Of) -> usize
where
    T: Incident<Of, To>,
    Of: Cell,
    To: Cell,
{
    let mut n = 0;
    t.foreach_incident(c, |_: To| n += 1);
    n
}

impl Degree<Vertex> for CMap2 {
    /// Incident edges.
    fn degree(&self, v: Vertex) -> usize {
        count::<_, _, Edge>(self, v)
    }
}

impl Codegree<Edge> for CMap2 {
    fn codegree(&self, _e: Edge) -> usize {
        2
    }
}

impl Degree<Edge> for CMap2 {
    /// Incident non-boundary faces.
    fn degree(&self, e: Edge) -> usize {
        count::<_, _, Face>(self, e)
    }
}

impl Degree<Face> for CMap2 {
    /// Number of darts of the face.
    fn degree(&self, f: Face) -> usize {
        self.nb_darts_of(f)
    }
}

impl Codegree<Face> for CMap2 {
    fn codegree(&self, f: Face) -> usize {
        self.nb_darts_of(f)
    }
}

impl Codegree<Volume> for CMap2 {
    fn codegree(&self, v: Volume) -> usize {
        count::<_, _, Face>(self, v)
    }
}

impl DebugInvariants for CMap2 {
    const LABEL: &'static str = "CMap2";

    fn validate_invariants(&self) -> Result<(), MeshCmapError> {
        self.check_topology()?;
        for orbit in Orbit::ALL {
            if self.base().is_embedded(orbit) {
                self.check_orbit_embedding(orbit)?;
            }
        }
        Ok(())
    }
}
