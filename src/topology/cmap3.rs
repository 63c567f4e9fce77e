//! 3-dimensional combinatorial maps (volume meshes).
//!
//! Each volume is a closed 2-map; phi3 glues two volumes along a face with
//! opposite orientations. A closed 3-map has no phi3 fixed point: the outer
//! hull is wrapped in boundary volumes whose darts carry the boundary mark.

use crate::config::MapConfig;
use crate::data::container::AttributeId;
use crate::debug_invariants::DebugInvariants;
use crate::define_cell;
use crate::mesh_error::MeshCmapError;
use crate::topology::cell::Cell;
use crate::topology::cmap2::CMap2;
use crate::topology::dart::Dart;
use crate::topology::embedding::Embedding;
use crate::topology::incidence::{Codegree, Degree, Incident, impl_adjacent, impl_incident};
use crate::topology::map::Topology;
use crate::topology::map_base::MapBase;
use crate::topology::orbit::Orbit;
use crate::topology::traversal::Traversal;

define_cell!(
    /// All darts around a vertex, across volumes.
    Vertex => Orbit::Phi21Phi31
);
define_cell!(
    /// All darts around an edge, across volumes.
    Edge => Orbit::Phi2Phi3
);
define_cell!(
    /// Both sides of a face.
    Face => Orbit::Phi1Phi3
);
define_cell!(Volume => Orbit::Phi1Phi2);
define_cell!(ConnectedComponent => Orbit::Phi1Phi2Phi3);
define_cell!(
    /// Vertex of one volume.
    Vertex2 => Orbit::Phi21
);
define_cell!(
    /// Edge of one volume.
    Edge2 => Orbit::Phi2
);
define_cell!(
    /// Face seen from one volume.
    Face2 => Orbit::Phi1
);

pub struct CMap3 {
    map2: CMap2,
    phi3: AttributeId,
}

impl std::fmt::Debug for CMap3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CMap3").field("base", self.base()).finish()
    }
}

impl Default for CMap3 {
    fn default() -> Self {
        Self::new()
    }
}

impl CMap3 {
    pub fn new() -> Self {
        Self::with_config(MapConfig::default())
    }

    pub fn with_config(config: MapConfig) -> Self {
        let mut map2 = CMap2::with_config(config);
        let phi3 = map2.base_mut().add_relation("phi3");
        Self { map2, phi3 }
    }

    /// The underlying 2-map (phi1 and phi2).
    pub fn map2(&self) -> &CMap2 {
        &self.map2
    }

    // ---------------------------------------------------------------------
    // Low-level operations (embeddings are not updated)
    // ---------------------------------------------------------------------

    /// # Panics
    /// Panics if `d` or `e` is already linked by phi3.
    pub fn phi3_sew(&mut self, d: Dart, e: Dart) {
        assert!(self.phi3(d) == d, "phi3_sew: {d:?} is already sewn");
        assert!(self.phi3(e) == e, "phi3_sew: {e:?} is already sewn");
        let phi3 = self.map2.base_mut().relation_mut(self.phi3);
        phi3[d.index()] = e;
        phi3[e.index()] = d;
    }

    pub fn phi3_unsew(&mut self, d: Dart) {
        let e = self.phi3(d);
        let phi3 = self.map2.base_mut().relation_mut(self.phi3);
        phi3[d.index()] = d;
        phi3[e.index()] = e;
    }

    pub fn phi2_sew(&mut self, d: Dart, e: Dart) {
        self.map2.phi2_sew(d, e);
    }

    pub fn phi2_unsew(&mut self, d: Dart) {
        self.map2.phi2_unsew(d);
    }

    /// A lone phi1 cycle (phi2 and phi3 free).
    pub fn add_face_topo_fp(&mut self, size: usize) -> Dart {
        self.map2.map1_mut().add_face_topo(size)
    }

    // ---------------------------------------------------------------------
    // Topological operations
    // ---------------------------------------------------------------------

    /// Cut the edge of `d` in every volume around it; returns the new dart
    /// following `d`. The map must be closed.
    pub fn cut_edge_topo(&mut self, d: Dart) -> Dart {
        let mut d23 = self.phi3(self.phi2(d));
        let nd = self.map2.cut_edge_topo(d);
        while d23 != d {
            let prev = d23;
            d23 = self.phi3(self.phi2(d23));
            self.map2.cut_edge_topo(prev);
            let d3 = self.phi3(prev);
            self.phi3_unsew(prev);
            let (a, b) = (self.phi1(d3), self.phi1(prev));
            self.phi3_sew(prev, a);
            self.phi3_sew(d3, b);
        }
        let d3 = self.phi3(d);
        self.phi3_unsew(d);
        let (a, b) = (self.phi1(d3), self.phi1(d));
        self.phi3_sew(d, a);
        self.phi3_sew(d3, b);
        nd
    }

    /// Split the face of `d` and `e` on both phi3 sides; returns the new
    /// dart preceding `d`.
    pub fn cut_face_topo(&mut self, d: Dart, e: Dart) -> Dart {
        let dd = self.phi1(self.phi3(d));
        let ee = self.phi1(self.phi3(e));
        self.map2.cut_face_topo(d, e);
        self.map2.cut_face_topo(dd, ee);
        let (a, b) = (self.phi_1(d), self.phi_1(ee));
        self.phi3_sew(a, b);
        let (a, b) = (self.phi_1(e), self.phi_1(dd));
        self.phi3_sew(a, b);
        self.phi_1(d)
    }

    /// Flat volume: one quad against two triangles. Returns a dart of the
    /// quad; phi3 is free.
    pub fn add_stamp_volume_topo(&mut self) -> Dart {
        let quad = self.add_face_topo_fp(4);
        let tri1 = self.add_face_topo_fp(3);
        let tri2 = self.add_face_topo_fp(3);
        self.phi2_sew(tri1, tri2);
        self.phi2_sew(quad, self.phi1(tri1));
        self.phi2_sew(self.phi1(quad), self.phi_1(tri2));
        self.phi2_sew(self.phi(quad, 11), self.phi1(tri2));
        self.phi2_sew(self.phi_1(quad), self.phi_1(tri1));
        quad
    }

    /// Pyramid over an `n`-gon: `n` triangles around an apex closed by the
    /// base. Returns a dart of the base; phi3 is free.
    ///
    /// # Panics
    /// Panics if `n == 0`.
    pub fn add_pyramid_topo(&mut self, n: usize) -> Dart {
        assert!(n > 0, "a pyramid needs at least one side");
        let first = self.add_face_topo_fp(3);
        let mut current = first;
        for _ in 1..n {
            let next = self.add_face_topo_fp(3);
            self.phi2_sew(self.phi_1(current), self.phi1(next));
            current = next;
        }
        self.phi2_sew(self.phi_1(current), self.phi1(first));
        self.map2.close_hole_topo(first)
    }

    /// Prism over an `n`-gon: `n` quads closed by two `n`-gons. Returns a
    /// dart of one cap; phi3 is free.
    ///
    /// # Panics
    /// Panics if `n == 0`.
    pub fn add_prism_topo(&mut self, n: usize) -> Dart {
        assert!(n > 0, "a prism needs at least one side");
        let first = self.add_face_topo_fp(4);
        let mut current = first;
        for _ in 1..n {
            let next = self.add_face_topo_fp(4);
            self.phi2_sew(self.phi1(current), self.phi_1(next));
            current = next;
        }
        self.phi2_sew(self.phi1(current), self.phi_1(first));
        let top = self.phi(first, 11);
        self.map2.close_hole_topo(top);
        self.map2.close_hole_topo(first)
    }

    /// Boundary volume filling the phi3 hole that contains `d`. Returns
    /// `phi3(d)`; boundary marks are left to the caller.
    ///
    /// # Panics
    /// Panics if `d` is not a phi3 fixed point.
    pub fn close_hole_topo(&mut self, d: Dart) -> Dart {
        assert!(self.phi3(d) == d, "close_hole_topo: {d:?} is not a phi3 fixed point");
        let mut visited = self.dart_marker_store();
        let mut created = self.dart_marker_store();
        let mut faces = vec![d];
        for e in self.orbit_darts(Face2(d)) {
            visited.mark(e);
        }
        let mut i = 0;
        while i < faces.len() {
            let it = faces[i];
            i += 1;
            let size = self.nb_darts_of(Face2(it));
            let b = self.add_face_topo_fp(size);
            for e in self.orbit_darts(Face2(b)) {
                created.mark(e);
            }
            let mut f = it;
            let mut bit = b;
            loop {
                let mut e = self.phi3(self.phi2(f));
                loop {
                    if self.phi3(e) == e {
                        if !visited.is_marked(e) {
                            faces.push(e);
                            for x in self.orbit_darts(Face2(e)) {
                                visited.mark(x);
                            }
                        }
                        break;
                    }
                    if created.is_marked(e) {
                        self.phi2_sew(e, bit);
                        break;
                    }
                    e = self.phi3(self.phi2(e));
                }
                self.phi3_sew(f, bit);
                bit = self.phi_1(bit);
                f = self.phi1(f);
                if f == it {
                    break;
                }
            }
        }
        self.phi3(d)
    }

    /// Mark every dart of the volume of `d` as boundary.
    pub(crate) fn set_volume_boundary(&mut self, d: Dart, b: bool) {
        for e in self.orbit_darts(Volume(d)) {
            self.map2.set_boundary(e, b);
        }
    }

    // ---------------------------------------------------------------------
    // Embedded operations
    // ---------------------------------------------------------------------

    /// Pyramid wrapped in a boundary volume, every embedded orbit completed.
    pub fn add_pyramid(&mut self, n: usize) -> Volume {
        let d = self.add_pyramid_topo(n);
        self.close_volume(d)
    }

    /// Prism wrapped in a boundary volume, every embedded orbit completed.
    pub fn add_prism(&mut self, n: usize) -> Volume {
        let d = self.add_prism_topo(n);
        self.close_volume(d)
    }

    fn close_volume(&mut self, d: Dart) -> Volume {
        let b = self.close_hole_topo(d);
        self.set_volume_boundary(b, true);
        self.complete_embeddings();
        Volume(d)
    }

    // ---------------------------------------------------------------------
    // Boundary and connectivity queries
    // ---------------------------------------------------------------------

    /// Whether a face of `v` is shared with a boundary volume.
    pub fn is_adjacent_to_boundary(&self, v: Volume) -> bool {
        !self.foreach_dart_of_until(v, |d| !self.is_boundary(self.phi3(d)))
    }

    pub fn vertices(&self, e: Edge) -> (Vertex, Vertex) {
        (Vertex(e.dart()), Vertex(self.phi1(e.dart())))
    }
}

impl Topology for CMap3 {
    const DIMENSION: usize = 3;

    #[inline]
    fn base(&self) -> &MapBase {
        self.map2.base()
    }

    #[inline]
    fn base_mut(&mut self) -> &mut MapBase {
        self.map2.base_mut()
    }

    #[inline]
    fn phi1(&self, d: Dart) -> Dart {
        self.map2.phi1(d)
    }

    #[inline]
    fn phi_1(&self, d: Dart) -> Dart {
        self.map2.phi_1(d)
    }

    #[inline]
    fn phi2(&self, d: Dart) -> Dart {
        self.map2.phi2(d)
    }

    #[inline]
    fn phi3(&self, d: Dart) -> Dart {
        self.base().relation(self.phi3)[d.index()]
    }

    fn supports(_orbit: Orbit) -> bool {
        true
    }

    fn check_dart_integrity(&self, d: Dart) -> bool {
        self.map2.check_dart_integrity(d)
            && self.phi3(self.phi3(d)) == d
            && self.phi3(d) != d
            && self.phi3(self.phi1(self.phi3(self.phi1(d)))) == d
    }

    fn check_boundary_integrity(&self, d: Dart) -> bool {
        self.is_boundary(d) == self.is_boundary(self.phi1(d))
            && self.is_boundary(d) == self.is_boundary(self.phi2(d))
    }

    fn refresh_handles(&mut self) -> Result<(), MeshCmapError> {
        self.map2.refresh_handles()?;
        self.phi3 = self
            .base()
            .relation_id("phi3")
            .ok_or_else(|| MeshCmapError::CorruptedContainer("relation `phi3` missing".into()))?;
        Ok(())
    }
}

impl_incident!(CMap3 {
    Vertex => Edge;
    Vertex => Face;
    Vertex => Volume, skip_boundary;
    Edge => Vertex;
    Edge => Face;
    Edge => Volume, skip_boundary;
    Face => Vertex;
    Face => Edge;
    Face => Volume, skip_boundary;
    Volume => Vertex;
    Volume => Edge;
    Volume => Face;
    Vertex2 => Edge2;
    Vertex2 => Face2;
    Edge2 => Vertex2;
    Edge2 => Face2;
    Face2 => Vertex2;
    Face2 => Edge2;
});

impl_adjacent!(CMap3 {
    Vertex => Edge;
    Vertex => Face;
    Vertex => Volume;
    Edge => Vertex;
    Edge => Face;
    Edge => Volume;
    Face => Vertex;
    Face => Edge;
    Face => Volume;
    Volume => Vertex;
    Volume => Edge;
    Volume => Face;
    Vertex2 => Edge2;
    Vertex2 => Face2;
    Edge2 => Vertex2;
    Edge2 => Face2;
    Face2 => Vertex2;
    Face2 => Edge2;
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

impl Degree<Vertex2> for CMap3 {
    fn degree(&self, v: Vertex2) -> usize {
        count::<_, _, Edge2>(self, v)
    }
}

impl Degree<Vertex> for CMap3 {
    fn degree(&self, v: Vertex) -> usize {
        count::<_, _, Edge>(self, v)
    }
}

impl Codegree<Edge2> for CMap3 {
    fn codegree(&self, _e: Edge2) -> usize {
        2
    }
}

impl Degree<Edge2> for CMap3 {
    fn degree(&self, e: Edge2) -> usize {
        count::<_, _, Face2>(self, e)
    }
}

impl Codegree<Edge> for CMap3 {
    fn codegree(&self, _e: Edge) -> usize {
        2
    }
}

impl Degree<Edge> for CMap3 {
    fn degree(&self, e: Edge) -> usize {
        count::<_, _, Face>(self, e)
    }
}

impl Codegree<Face2> for CMap3 {
    fn codegree(&self, f: Face2) -> usize {
        self.nb_darts_of(f)
    }
}

impl Degree<Face2> for CMap3 {
    fn degree(&self, f: Face2) -> usize {
        self.nb_darts_of(f)
    }
}

impl Codegree<Face> for CMap3 {
    fn codegree(&self, f: Face) -> usize {
        self.nb_darts_of(Face2(f.dart()))
    }
}

impl Degree<Face> for CMap3 {
    /// Non-boundary volumes on either side.
    fn degree(&self, f: Face) -> usize {
        let d = f.dart();
        if self.is_boundary(d) || self.is_boundary(self.phi3(d)) { 1 } else { 2 }
    }
}

impl Codegree<Volume> for CMap3 {
    fn codegree(&self, v: Volume) -> usize {
        count::<_, _, Face>(self, v)
    }
}

impl DebugInvariants for CMap3 {
    const LABEL: &'static str = "CMap3";

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

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> CMap3 {
        CMap3::with_config(MapConfig::default().with_chunk_size(16).with_workers(1))
    }

    /// Closed prism over a quad with one edge cut in both volumes.
    fn cut_prism() -> CMap3 {
        let mut m = map();
        let d = m.add_prism_topo(4);
        m.close_hole_topo(d);
        m.cut_edge_topo(d);
        m
    }

    fn assert_partition<C: Cell>(m: &CMap3) {
        let mut seen = vec![0usize; m.base().topology().nb_max() as usize];
        m.foreach_cell(|c: C| {
            m.foreach_dart_of(c, |d| seen[d.index() as usize] += 1);
        });
        for d in m.base().darts() {
            let n = seen[d.index() as usize];
            assert_eq!(n, 1, "{d:?} visited {n} times by {:?}", C::ORBIT);
        }
    }

    #[test]
    fn every_orbit_partitions_the_darts() {
        let m = cut_prism();
        assert_eq!(m.nb_darts(), 52);
        assert!(m.check_topology().is_ok());
        assert_partition::<Vertex>(&m);
        assert_partition::<Edge>(&m);
        assert_partition::<Face>(&m);
        assert_partition::<Volume>(&m);
        assert_partition::<ConnectedComponent>(&m);
        assert_partition::<Vertex2>(&m);
        assert_partition::<Edge2>(&m);
        assert_partition::<Face2>(&m);
        assert_eq!(m.nb_cells::<Vertex>(), 9);
        assert_eq!(m.nb_cells::<Edge>(), 13);
        assert_eq!(m.nb_cells::<Face>(), 6);
        assert_eq!(m.nb_cells::<Volume>(), 2);
    }

    #[test]
    fn phi3_unsew_undoes_sew() {
        let mut m = map();
        let a = m.add_face_topo_fp(1);
        let b = m.add_face_topo_fp(1);
        m.phi3_sew(a, b);
        assert_eq!(m.phi3(a), b);
        assert_eq!(m.phi3(b), a);
        assert_eq!(m.nb_darts_of(Face(a)), 2);
        m.phi3_unsew(a);
        assert_eq!(m.phi3(a), a);
        assert_eq!(m.phi3(b), b);
        assert_eq!(m.nb_darts_of(Face(a)), 1);
        m.phi3_sew(b, a);
        assert_eq!(m.phi3(a), b);
    }

    #[test]
    #[should_panic(expected = "already sewn")]
    fn sewing_a_sewn_dart_panics() {
        let mut m = map();
        let a = m.add_face_topo_fp(1);
        let b = m.add_face_topo_fp(1);
        let c = m.add_face_topo_fp(1);
        m.phi3_sew(a, b);
        m.phi3_sew(a, c);
    }
}
