#![allow(dead_code)]
use mesh_cmap::prelude::*;
use mesh_cmap::topology::cmap2::{Edge, Face, Vertex};

/// Small chunks so tests cross chunk boundaries.
pub fn config() -> MapConfig {
    MapConfig::default().with_chunk_size(16).with_workers(2)
}

/// `n` triangles around an apex, closed by an `n`-gon. No boundary darts.
pub fn pyramid_surface(n: usize) -> CMap2 {
    let mut map = CMap2::with_config(config());
    {
        let mut b = CMap2Builder::new(&mut map);
        let first = b.add_face_topo_fp(3);
        let mut current = first;
        for _ in 1..n {
            let next = b.add_face_topo_fp(3);
            let (x, y) = (b.map().phi_1(current), b.map().phi1(next));
            b.phi2_sew(x, y);
            current = next;
        }
        let (x, y) = (b.map().phi_1(current), b.map().phi1(first));
        b.phi2_sew(x, y);
        b.close_hole_topo(first);
    }
    map
}

/// `n` quads around an axis, closed by two `n`-gons. No boundary darts.
pub fn prism_surface(n: usize) -> CMap2 {
    let mut map = CMap2::with_config(config());
    {
        let mut b = CMap2Builder::new(&mut map);
        let first = b.add_face_topo_fp(4);
        let mut current = first;
        for _ in 1..n {
            let next = b.add_face_topo_fp(4);
            let (x, y) = (b.map().phi1(current), b.map().phi_1(next));
            b.phi2_sew(x, y);
            current = next;
        }
        let (x, y) = (b.map().phi1(current), b.map().phi_1(first));
        b.phi2_sew(x, y);
        let top = b.map().phi(first, 11);
        b.close_hole_topo(top);
        b.close_hole_topo(first);
    }
    map
}

/// `(vertices, edges, faces)` of a 2-map, boundary faces included.
pub fn counts(map: &CMap2) -> (usize, usize, usize) {
    (
        map.nb_cells::<Vertex>(),
        map.nb_cells::<Edge>(),
        map.nb_cells::<Face>(),
    )
}

/// Assert vec is a permutation of another vec (order-agnostic).
pub fn assert_permutation<T: Ord + Copy + std::fmt::Debug>(got: &[T], want: &[T]) {
    let mut a = got.to_vec();
    a.sort_unstable();
    let mut b = want.to_vec();
    b.sort_unstable();
    assert_eq!(a, b, "not a permutation\n got={:?}\nwant={:?}", got, want);
}
