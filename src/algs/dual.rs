//! Topological dual of a closed 2-map.
//!
//! Every vertex of the source becomes a face of the dual, every face a
//! vertex and every edge stays an edge. The source must be closed and have
//! no boundary: a surface with holes has no dual in this sense.

use crate::mesh_error::MeshCmapError;
use crate::topology::builder::CMap2Builder;
use crate::topology::cell::Cell;
use crate::topology::cmap2::{CMap2, Edge, Face, Vertex};
use crate::topology::dart::Dart;
use crate::topology::embedding::{Attribute, Embedding};
use crate::topology::map::Topology;
use crate::topology::traversal::Traversal;

/// Which links back to the source are stored on the dual.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DualOptions {
    /// `"FaceOfSrc"`: dual vertex -> source face.
    pub embed_vertices: bool,
    /// `"EdgeOfSrc"`: dual edge -> source edge.
    pub embed_edges: bool,
    /// `"VertexOfSrc"`: dual face -> source vertex.
    pub embed_faces: bool,
}

impl Default for DualOptions {
    fn default() -> Self {
        Self {
            embed_vertices: true,
            embed_edges: false,
            embed_faces: false,
        }
    }
}

/// Build the dual of `src` in a fresh map with the same configuration.
///
/// Links to the source are stored as `Dart` attributes holding a
/// representative dart of the source cell; see [`DualOptions`].
pub fn dual2_topo(src: &CMap2, options: DualOptions) -> Result<CMap2, MeshCmapError> {
    if let Some(d) = src.base().darts().find(|&d| src.is_boundary(d) || src.phi2(d) == d) {
        log::error!("dual2_topo: cannot compute the dual of an open map (dart {d})");
        return Err(MeshCmapError::OpenMap);
    }

    let mut dst = CMap2::with_config(*src.base().config());
    let mut corresp = vec![Dart::INVALID; src.base().topology().nb_max() as usize];
    {
        let mut build = CMap2Builder::new(&mut dst);
        src.foreach_cell(|v: Vertex| {
            let mut df = build.add_face_topo_fp(src.nb_darts_of(v));
            src.foreach_dart_of(v, |d| {
                corresp[d.index() as usize] = df;
                df = build.map().phi1(df);
            });
        });
        src.foreach_cell(|e: Edge| {
            let d1 = corresp[e.dart().index() as usize];
            let d2 = corresp[src.phi2(e.dart()).index() as usize];
            build.phi2_sew(d1, d2);
        });
    }

    if options.embed_vertices {
        let face_of_src: Attribute<Dart, Vertex> = link(&mut dst, "FaceOfSrc")?;
        src.foreach_cell(|f: Face| {
            let v = Vertex(dst.phi2(corresp[f.dart().index() as usize]));
            dst.set_attribute(&face_of_src, v, f.dart());
        });
    }
    if options.embed_edges {
        let edge_of_src: Attribute<Dart, Edge> = link(&mut dst, "EdgeOfSrc")?;
        src.foreach_cell(|e: Edge| {
            let ee = Edge(corresp[e.dart().index() as usize]);
            dst.set_attribute(&edge_of_src, ee, e.dart());
        });
    }
    if options.embed_faces {
        let vertex_of_src: Attribute<Dart, Face> = link(&mut dst, "VertexOfSrc")?;
        src.foreach_cell(|v: Vertex| {
            let f = Face(corresp[v.dart().index() as usize]);
            dst.set_attribute(&vertex_of_src, f, v.dart());
        });
    }

    log::debug!(
        "dual2_topo: {} vertices, {} faces",
        dst.nb_cells::<Vertex>(),
        dst.nb_cells::<Face>()
    );
    Ok(dst)
}

fn link<C: Cell>(dst: &mut CMap2, name: &str) -> Result<Attribute<Dart, C>, MeshCmapError> {
    dst.add_attribute::<Dart, C>(name)
        .ok_or_else(|| MeshCmapError::InvalidName(name.to_string()))
}
