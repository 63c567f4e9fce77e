//! 1-dimensional combinatorial maps: darts linked into faces by phi1.
//!
//! A face is a phi1 cycle; vertices and edges are single darts. The phi1
//! permutation is stored with its inverse phi_1 so both directions are O(1).

use crate::config::MapConfig;
use crate::data::container::AttributeId;
use crate::debug_invariants::DebugInvariants;
use crate::define_cell;
use crate::mesh_error::MeshCmapError;
use crate::topology::cell::Cell;
use crate::topology::dart::Dart;
use crate::topology::embedding::Embedding;
use crate::topology::incidence::{Codegree, Degree, impl_adjacent, impl_incident};
use crate::topology::map::Topology;
use crate::topology::map_base::MapBase;
use crate::topology::orbit::Orbit;
use crate::topology::traversal::Traversal;

define_cell!(
    /// Vertex of a 1-map: one dart.
    Vertex => Orbit::Dart
);
define_cell!(
    /// Edge of a 1-map: one dart.
    Edge => Orbit::Dart
);
define_cell!(
    /// A phi1 cycle.
    Face => Orbit::Phi1
);
define_cell!(Volume => Orbit::Phi1);

pub struct CMap1 {
    base: MapBase,
    phi1: AttributeId,
    phi_1: AttributeId,
}

impl std::fmt::Debug for CMap1 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CMap1").field("base", &self.base).finish()
    }
}

impl Default for CMap1 {
    fn default() -> Self {
        Self::new()
    }
}

impl CMap1 {
    pub fn new() -> Self {
        Self::with_config(MapConfig::default())
    }

    pub fn with_config(config: MapConfig) -> Self {
        let mut base = MapBase::new(config);
        let phi1 = base.add_relation("phi1");
        let phi_1 = base.add_relation("phi_1");
        Self { base, phi1, phi_1 }
    }

    // ---------------------------------------------------------------------
    // Low-level operations (embeddings are not updated)
    // ---------------------------------------------------------------------

    /// New dart, fixed point of every relation.
    pub fn add_dart(&mut self) -> Dart {
        self.base.add_topology_element()
    }

    /// Free `d`. Its relations are not unlinked.
    pub fn remove_dart(&mut self, d: Dart) {
        self.base.remove_topology_element(d);
    }

    /// `d->f, e->g` becomes `d->g, e->f`: merges two phi1 cycles, or splits
    /// one if `d` and `e` share it.
    pub fn phi1_sew(&mut self, d: Dart, e: Dart) {
        let f = self.phi1(d);
        let g = self.phi1(e);
        let phi1 = self.base.relation_mut(self.phi1);
        phi1[d.index()] = g;
        phi1[e.index()] = f;
        let phi_1 = self.base.relation_mut(self.phi_1);
        phi_1[g.index()] = d;
        phi_1[f.index()] = e;
    }

    /// `d->e->f` becomes `d->f` with `e` a fixed point.
    pub fn phi1_unsew(&mut self, d: Dart) {
        let e = self.phi1(d);
        let f = self.phi1(e);
        let phi1 = self.base.relation_mut(self.phi1);
        phi1[d.index()] = f;
        phi1[e.index()] = e;
        let phi_1 = self.base.relation_mut(self.phi_1);
        phi_1[f.index()] = d;
        phi_1[e.index()] = e;
    }

    // ---------------------------------------------------------------------
    // Topological operations
    // ---------------------------------------------------------------------

    /// Face of `size` darts; returns one of them.
    ///
    /// # Panics
    /// Panics if `size == 0`.
    pub fn add_face_topo(&mut self, size: usize) -> Dart {
        assert!(size > 0, "cannot create an empty face");
        let d = self.add_dart();
        for _ in 1..size {
            self.cut_edge_topo(d);
        }
        d
    }

    pub fn remove_face_topo(&mut self, d: Dart) {
        let mut e = self.phi1(d);
        while e != d {
            let f = self.phi1(e);
            self.remove_dart(e);
            e = f;
        }
        self.remove_dart(d);
    }

    /// Insert a new dart after `d` in its face and return it.
    pub fn cut_edge_topo(&mut self, d: Dart) -> Dart {
        let e = self.add_dart();
        self.phi1_sew(d, e);
        e
    }

    /// Unlink `d` from its face and free it.
    ///
    /// # Panics
    /// Panics if `d` is a phi1 fixed point.
    pub fn collapse_edge_topo(&mut self, d: Dart) {
        let e = self.phi_1(d);
        assert!(e != d, "cannot collapse the edge of a phi1 fixed point");
        self.phi1_unsew(e);
        self.remove_dart(d);
    }

    /// Reverse the phi1 orientation of the face of `d`.
    pub fn reverse_face_topo(&mut self, d: Dart) {
        let e = self.phi1(d);
        if e == d || self.phi1(e) == d {
            return;
        }
        self.phi1_unsew(d);
        let mut next = self.phi1(d);
        while next != d {
            self.phi1_unsew(d);
            self.phi1_sew(e, next);
            next = self.phi1(d);
        }
        self.phi1_sew(e, d);
    }

    // ---------------------------------------------------------------------
    // Embedded operations
    // ---------------------------------------------------------------------

    pub fn add_face(&mut self, size: usize) -> Face {
        let d = self.add_face_topo(size);
        if self.base.is_embedded(Orbit::Dart) {
            for e in self.orbit_darts(Face(d)) {
                self.new_orbit_embedding_of(Orbit::Dart, e);
            }
        }
        self.new_embeddings_of(&[Orbit::Phi1], d);
        Face(d)
    }

    pub fn remove_face(&mut self, f: Face) {
        self.remove_face_topo(f.dart());
    }

    /// Cut `e` in two; returns the new vertex.
    pub fn cut_edge(&mut self, e: Edge) -> Vertex {
        let nd = self.cut_edge_topo(e.dart());
        self.new_embeddings_of(&[Orbit::Dart], nd);
        if self.base.is_embedded(Orbit::Phi1) {
            self.copy_embedding::<Face>(nd, e.dart());
        }
        Vertex(nd)
    }

    /// Remove `e` from its face; returns the vertex that followed it.
    pub fn collapse_edge(&mut self, e: Edge) -> Vertex {
        let next = self.phi1(e.dart());
        self.collapse_edge_topo(e.dart());
        Vertex(next)
    }

    pub fn reverse_face(&mut self, f: Face) {
        self.reverse_face_topo(f.dart());
    }
}

impl Topology for CMap1 {
    const DIMENSION: usize = 1;

    #[inline]
    fn base(&self) -> &MapBase {
        &self.base
    }

    #[inline]
    fn base_mut(&mut self) -> &mut MapBase {
        &mut self.base
    }

    #[inline]
    fn phi1(&self, d: Dart) -> Dart {
        self.base.relation(self.phi1)[d.index()]
    }

    #[inline]
    fn phi_1(&self, d: Dart) -> Dart {
        self.base.relation(self.phi_1)[d.index()]
    }

    fn supports(orbit: Orbit) -> bool {
        matches!(orbit, Orbit::Dart | Orbit::Phi1)
    }

    fn check_dart_integrity(&self, d: Dart) -> bool {
        self.phi1(self.phi_1(d)) == d && self.phi_1(self.phi1(d)) == d
    }

    fn refresh_handles(&mut self) -> Result<(), MeshCmapError> {
        let missing = |name: &str| MeshCmapError::CorruptedContainer(format!("relation `{name}` missing"));
        self.phi1 = self.base.relation_id("phi1").ok_or_else(|| missing("phi1"))?;
        self.phi_1 = self.base.relation_id("phi_1").ok_or_else(|| missing("phi_1"))?;
        Ok(())
    }
}

impl_incident!(CMap1 {
    Face => Vertex;
    Face => Edge;
    Vertex => Face;
    Edge => Face;
});

impl_adjacent!(CMap1 {
    Face => Vertex;
});

impl Degree<Face> for CMap1 {
    fn degree(&self, f: Face) -> usize {
        self.nb_darts_of(f)
    }
}

impl Codegree<Face> for CMap1 {
    fn codegree(&self, f: Face) -> usize {
        self.nb_darts_of(f)
    }
}

impl DebugInvariants for CMap1 {
    const LABEL: &'static str = "CMap1";

    fn validate_invariants(&self) -> Result<(), MeshCmapError> {
        self.check_topology()?;
        for orbit in Orbit::ALL {
            if self.base.is_embedded(orbit) {
                self.check_orbit_embedding(orbit)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> CMap1 {
        CMap1::with_config(MapConfig::default().with_chunk_size(16).with_workers(1))
    }

    #[test]
    fn sew_then_unsew_restores_cycles() {
        let mut m = map();
        let a = m.add_face_topo(3);
        let b = m.add_face_topo(2);
        m.phi1_sew(a, b);
        assert_eq!(m.nb_darts_of(Face(a)), 5);
        assert!(m.check_topology().is_ok());
        m.phi1_sew(a, b);
        assert_eq!(m.nb_darts_of(Face(a)), 3);
        assert_eq!(m.nb_darts_of(Face(b)), 2);
    }

    #[test]
    fn unsew_makes_a_fixed_point() {
        let mut m = map();
        let d = m.add_face_topo(3);
        let e = m.phi1(d);
        m.phi1_unsew(d);
        assert_eq!(m.phi1(e), e);
        assert_eq!(m.phi_1(e), e);
        assert_eq!(m.degree(Face(d)), 2);
    }

    #[test]
    fn reverse_face_inverts_orientation() {
        let mut m = map();
        let d = m.add_face_topo(5);
        let before: Vec<Dart> = m.orbit_darts(Face(d));
        m.reverse_face_topo(d);
        assert!(m.check_topology().is_ok());
        for w in before.windows(2) {
            assert_eq!(m.phi1(w[1]), w[0]);
        }
        assert_eq!(m.degree(Face(d)), 5);
    }

    #[test]
    fn collapse_edge_removes_one_dart() {
        let mut m = map();
        let d = m.add_face_topo(4);
        let e = m.phi1(d);
        m.collapse_edge_topo(e);
        assert_eq!(m.nb_darts(), 3);
        assert_eq!(m.degree(Face(d)), 3);
    }

    #[test]
    #[should_panic(expected = "fixed point")]
    fn collapse_of_a_loop_panics() {
        let mut m = map();
        let d = m.add_face_topo(1);
        m.collapse_edge_topo(d);
    }

    #[test]
    fn embedded_ops_keep_faces_well_embedded() {
        let mut m = map();
        m.add_face(3);
        let area = m.add_attribute::<f64, Face>("area").unwrap();
        let f = m.add_face(4);
        m.set_attribute(&area, f, 2.5);
        let v = m.cut_edge(Edge(f.dart()));
        assert_eq!(*m.attribute(&area, Face(v.dart())), 2.5);
        assert!(m.is_well_embedded::<Face>());
        m.collapse_edge(Edge(v.dart()));
        assert!(m.validate_invariants().is_ok());
        m.remove_face(f);
        assert_eq!(m.nb_cells::<Face>(), 1);
        assert!(m.is_well_embedded::<Face>());
    }

    #[test]
    fn incidence_within_a_face() {
        let mut m = map();
        let d = m.add_face_topo(4);
        let other = m.add_face_topo(2);
        assert_eq!(m.incident::<Face, Vertex>(Face(d)).len(), 4);
        assert_eq!(m.incident::<Face, Edge>(Face(other)).len(), 2);
        assert_eq!(m.incident::<Vertex, Face>(Vertex(d)), vec![Face(d)]);
        assert_eq!(m.adjacent::<Face, Vertex>(Face(d)), Vec::<Face>::new());
        assert!(m.has_codegree(Face(d), 4));
    }
}
