//! Read-only cell traversal spread over rayon tasks.
//!
//! Cells are enumerated once on the calling thread, split into at most
//! `nb_workers` chunks, and each chunk is visited on its own [`Scoped`]
//! view so every task draws markers from a distinct worker slot.

use rayon::prelude::*;

use crate::topology::cell::Cell;
use crate::topology::map::{Scoped, Topology};
use crate::topology::marker::WorkerId;
use crate::topology::traversal::Traversal;

fn chunk_len(nb_cells: usize, nb_workers: usize) -> usize {
    nb_cells.div_ceil(nb_workers.max(1)).max(1)
}

/// Call `f` once per `C` cell from a pool of rayon tasks.
pub fn par_foreach_cell<M, C, F>(map: &M, f: F)
where
    M: Topology + Sync,
    C: Cell,
    F: Fn(Scoped<'_, M>, C) + Sync + Send,
{
    let cells: Vec<C> = map.cells();
    let chunk = chunk_len(cells.len(), map.base().config().nb_workers);
    cells.par_chunks(chunk).enumerate().for_each(|(i, part)| {
        let view = map.scoped(WorkerId(i));
        for &c in part {
            f(view, c);
        }
    });
}

/// Map every `C` cell through `f` in parallel; results follow the order of
/// [`Traversal::cells`].
pub fn par_map_cells<M, C, R, F>(map: &M, f: F) -> Vec<R>
where
    M: Topology + Sync,
    C: Cell,
    R: Send,
    F: Fn(Scoped<'_, M>, C) -> R + Sync + Send,
{
    let cells: Vec<C> = map.cells();
    let chunk = chunk_len(cells.len(), map.base().config().nb_workers);
    let parts: Vec<Vec<R>> = cells
        .par_chunks(chunk)
        .enumerate()
        .map(|(i, part)| {
            let view = map.scoped(WorkerId(i));
            part.iter().map(|&c| f(view, c)).collect()
        })
        .collect();
    parts.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;
    use crate::topology::cmap2::{CMap2, Face, Vertex};
    use crate::topology::incidence::Degree;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn chunks_never_exceed_workers() {
        for (n, w) in [(0, 4), (1, 4), (7, 4), (8, 4), (100, 3)] {
            let chunk = chunk_len(n, w);
            assert!(n.div_ceil(chunk) <= w);
        }
    }

    #[test]
    fn parallel_visit_matches_serial() {
        let mut map = CMap2::with_config(MapConfig::default().with_chunk_size(32).with_workers(4));
        for size in 3..12 {
            map.add_face_topo(size);
        }
        let seen = AtomicUsize::new(0);
        par_foreach_cell(&map, |view, v: Vertex| {
            seen.fetch_add(view.nb_darts_of(v), Ordering::Relaxed);
        });
        assert_eq!(seen.into_inner(), map.nb_darts());

        let degrees = par_map_cells(&map, |view, f: Face| view.inner().degree(f));
        let serial: Vec<usize> = map.cells::<Face>().into_iter().map(|f| map.degree(f)).collect();
        assert_eq!(degrees, serial);
    }
}
