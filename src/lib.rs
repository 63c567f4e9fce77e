#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-cmap
//!
//! mesh-cmap is a combinatorial-map kernel for cellular meshes. Darts are
//! rows of a refcounted attribute container; the phi permutations that
//! link them are attributes of that container; cells are orbits of darts
//! under subgroups of the phi permutations.
//!
//! ## Features
//! - Chunked, type-erased attribute arrays with name lookup and a binary
//!   save/load format
//! - 1-, 2- and 3-dimensional maps with low-level sewing, topological
//!   operators (cut, collapse, close) and embedded variants that keep
//!   cell attributes consistent
//! - Orbit traversal with reusable per-worker dart and cell markers
//! - Incidence, adjacency, degree and codegree queries
//! - Builders for importing surface and volume meshes
//! - Dual of closed surfaces, and parallel cell traversal behind the
//!   `rayon` feature
//!
//! ## Invariants
//!
//! Every map implements [`DebugInvariants`]. With `check-invariants` or
//! `strict-invariants` enabled (or in debug builds) `debug_assert_invariants`
//! panics on the first broken relation or embedding.
//!
//! ## Usage
//!
//! ```ignore
//! use mesh_cmap::prelude::*;
//! use mesh_cmap::topology::cmap2::{Face, Vertex};
//!
//! let mut map = CMap2::new();
//! let pos = map.add_attribute::<[f64; 3], Vertex>("position").unwrap();
//! let f = map.add_face(3);
//! assert_eq!(map.nb_cells::<Vertex>(), 3);
//! assert_eq!(map.codegree(f), 3);
//! ```

pub mod algs;
pub mod config;
pub mod data;
pub mod debug_invariants;
pub mod mesh_error;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::{DualOptions, dual2_topo};
    #[cfg(feature = "rayon")]
    pub use crate::algs::{par_foreach_cell, par_map_cells};
    pub use crate::config::MapConfig;
    pub use crate::data::{AttributeContainer, AttributeValue};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::mesh_error::MeshCmapError;
    pub use crate::topology::{
        Adjacent, Attribute, CMap1, CMap2, CMap2Builder, CMap3, CMap3Builder, Cell, Codegree,
        Dart, Degree, Embedding, Incident, Orbit, Topology, Traversal, TraversalStrategy,
        WorkerId,
    };
}
