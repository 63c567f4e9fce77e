//! Combinatorial-map topology.
//!
//! Darts, the orbits that group them into cells, and the 1-, 2- and
//! 3-dimensional maps built from phi permutations stored in a dart
//! container. Maps are traversed through [`Traversal`], queried for
//! incidence through [`Incident`] and [`Adjacent`], and carry cell data
//! through [`Embedding`].

pub mod builder;
pub mod cell;
pub mod cmap1;
pub mod cmap2;
pub mod cmap3;
pub mod dart;
pub mod embedding;
pub mod incidence;
pub mod map;
pub mod map_base;
pub mod marker;
pub mod orbit;
pub mod traversal;

pub use builder::{CMap2Builder, CMap3Builder};
pub use cell::Cell;
pub use cmap1::CMap1;
pub use cmap2::CMap2;
pub use cmap3::CMap3;
pub use dart::Dart;
pub use embedding::{Attribute, Embedding};
pub use incidence::{Adjacent, Codegree, Degree, Incident};
pub use map::{Scoped, Topology};
pub use map_base::MapBase;
pub use marker::{CellMarker, DartMarker, DartMarkerStore, WorkerId};
pub use orbit::Orbit;
pub use traversal::{Traversal, TraversalStrategy};

#[cfg(test)]
mod tests;
