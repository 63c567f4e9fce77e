//! Algorithms built on the map kernels.

pub mod dual;
#[cfg(feature = "rayon")]
pub mod parallel;

pub use dual::{DualOptions, dual2_topo};
#[cfg(feature = "rayon")]
pub use parallel::{par_foreach_cell, par_map_cells};
