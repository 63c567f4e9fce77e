//! Builders for importing meshes into 2- and 3-maps.
//!
//! A builder exposes the low-level construction steps a mesh importer needs:
//! free faces or volumes, sewing, and the final `close_map` which fills
//! every remaining hole with boundary cells and completes the embeddings
//! of every embedded orbit. Topology created through a builder is not
//! embedded until `close_map` runs.
//!
//! ```ignore
//! let mut map = CMap2::new();
//! let pos = map.add_attribute::<[f64; 3], Vertex>("position").unwrap();
//! let mut b = CMap2Builder::new(&mut map);
//! let t1 = b.add_face_topo_fp(3);
//! let t2 = b.add_face_topo_fp(3);
//! b.phi2_sew(t1, t2);
//! b.close_map();
//! assert!(map.check_map_integrity());
//! ```

use crate::topology::cmap2::{self, CMap2};
use crate::topology::cmap3::{self, CMap3};
use crate::topology::dart::Dart;
use crate::topology::embedding::Embedding;
use crate::topology::map::Topology;
use crate::topology::traversal::Traversal;

pub struct CMap2Builder<'a> {
    map: &'a mut CMap2,
}

impl<'a> CMap2Builder<'a> {
    pub fn new(map: &'a mut CMap2) -> Self {
        Self { map }
    }

    pub fn map(&self) -> &CMap2 {
        self.map
    }

    pub fn map_mut(&mut self) -> &mut CMap2 {
        self.map
    }

    /// Face of `size` darts with phi2 free.
    pub fn add_face_topo_fp(&mut self, size: usize) -> Dart {
        self.map.map1_mut().add_face_topo(size)
    }

    pub fn phi2_sew(&mut self, d: Dart, e: Dart) {
        self.map.phi2_sew(d, e);
    }

    pub fn phi2_unsew(&mut self, d: Dart) {
        self.map.phi2_unsew(d);
    }

    pub fn close_hole_topo(&mut self, d: Dart) -> Dart {
        self.map.close_hole_topo(d)
    }

    /// Fill the hole of `d` with a boundary face.
    pub fn close_hole(&mut self, d: Dart) -> cmap2::Face {
        let f = self.map.close_hole_topo(d);
        self.map.set_face_boundary(f, true);
        cmap2::Face(f)
    }

    /// Close every hole, then complete every embedded orbit. Returns the
    /// number of boundary faces added.
    pub fn close_map(&mut self) -> usize {
        let free: Vec<Dart> = self
            .map
            .base()
            .darts()
            .filter(|&d| self.map.phi2(d) == d)
            .collect();
        let mut nb_holes = 0;
        for d in free {
            if self.map.phi2(d) == d {
                self.close_hole(d);
                nb_holes += 1;
            }
        }
        self.map.complete_embeddings();
        log::debug!(
            "close_map: {nb_holes} boundary faces, {} darts",
            self.map.nb_darts()
        );
        nb_holes
    }
}

pub struct CMap3Builder<'a> {
    map: &'a mut CMap3,
}

impl<'a> CMap3Builder<'a> {
    pub fn new(map: &'a mut CMap3) -> Self {
        Self { map }
    }

    pub fn map(&self) -> &CMap3 {
        self.map
    }

    pub fn map_mut(&mut self) -> &mut CMap3 {
        self.map
    }

    /// Face of `size` darts with phi2 and phi3 free.
    pub fn add_face_topo_fp(&mut self, size: usize) -> Dart {
        self.map.add_face_topo_fp(size)
    }

    pub fn phi2_sew(&mut self, d: Dart, e: Dart) {
        self.map.phi2_sew(d, e);
    }

    pub fn phi2_unsew(&mut self, d: Dart) {
        self.map.phi2_unsew(d);
    }

    pub fn phi3_sew(&mut self, d: Dart, e: Dart) {
        self.map.phi3_sew(d, e);
    }

    pub fn phi3_unsew(&mut self, d: Dart) {
        self.map.phi3_unsew(d);
    }

    /// phi3-sew the faces of `d` and `e` dart by dart, walking them in
    /// opposite directions.
    ///
    /// # Panics
    /// Panics if the faces differ in size.
    pub fn sew_volumes(&mut self, d: Dart, e: Dart) {
        assert_eq!(
            self.map.nb_darts_of(cmap3::Face2(d)),
            self.map.nb_darts_of(cmap3::Face2(e)),
            "sew_volumes: faces of different sizes"
        );
        let (mut f, mut g) = (d, e);
        loop {
            self.map.phi3_sew(f, g);
            f = self.map.phi1(f);
            g = self.map.phi_1(g);
            if f == d {
                break;
            }
        }
    }

    pub fn add_stamp_volume_topo(&mut self) -> Dart {
        self.map.add_stamp_volume_topo()
    }

    pub fn add_pyramid_topo(&mut self, n: usize) -> Dart {
        self.map.add_pyramid_topo(n)
    }

    pub fn add_prism_topo(&mut self, n: usize) -> Dart {
        self.map.add_prism_topo(n)
    }

    pub fn close_hole_topo(&mut self, d: Dart) -> Dart {
        self.map.close_hole_topo(d)
    }

    /// Wrap the phi3 hole of `d` in a boundary volume.
    pub fn close_hole(&mut self, d: Dart) -> cmap3::Volume {
        let b = self.map.close_hole_topo(d);
        self.map.set_volume_boundary(b, true);
        cmap3::Volume(b)
    }

    /// Close every phi3 hole, then complete every embedded orbit. Returns
    /// the number of boundary volumes added.
    pub fn close_map(&mut self) -> usize {
        let free: Vec<Dart> = self
            .map
            .base()
            .darts()
            .filter(|&d| self.map.phi3(d) == d)
            .collect();
        let mut nb_holes = 0;
        for d in free {
            if self.map.phi3(d) == d {
                self.close_hole(d);
                nb_holes += 1;
            }
        }
        self.map.complete_embeddings();
        log::debug!(
            "close_map: {nb_holes} boundary volumes, {} darts",
            self.map.nb_darts()
        );
        nb_holes
    }
}
