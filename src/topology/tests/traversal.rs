use crate::config::MapConfig;
use crate::topology::builder::CMap2Builder;
use crate::topology::cell::Cell;
use crate::topology::cmap1::{self, CMap1};
use crate::topology::cmap2::{CMap2, Edge, Face, Vertex, Volume};
use crate::topology::dart::Dart;
use crate::topology::embedding::Embedding;
use crate::topology::map::Topology;
use crate::topology::marker::WorkerId;
use crate::topology::orbit::Orbit;
use crate::topology::traversal::{Traversal, TraversalStrategy};

fn small() -> MapConfig {
    MapConfig::default().with_chunk_size(8).with_workers(2)
}

fn counts(m: &CMap2) -> [usize; 5] {
    [
        m.nb_darts(),
        m.nb_cells::<Vertex>(),
        m.nb_cells::<Edge>(),
        m.nb_cells::<Face>(),
        m.nb_cells::<Volume>(),
    ]
}

#[test]
fn add_face_cell_counts() {
    let mut m = CMap2::with_config(small());
    m.add_face_topo(1);
    assert_eq!(counts(&m), [2, 1, 1, 2, 1]);
    m.add_face_topo(10);
    assert_eq!(counts(&m), [22, 11, 11, 4, 2]);
    assert!(m.check_map_integrity());
}

#[test]
fn each_dart_belongs_to_exactly_one_cell() {
    let mut m = CMap2::with_config(small());
    for size in [3, 4, 7] {
        m.add_face_topo(size);
    }
    let mut seen = vec![0usize; m.base().topology().nb_max() as usize];
    m.foreach_cell(|v: Vertex| {
        m.foreach_dart_of(v, |d| seen[d.index() as usize] += 1);
    });
    for d in m.base().darts() {
        assert_eq!(seen[d.index() as usize], 1, "{d:?} visited {} times", seen[d.index() as usize]);
    }
}

#[test]
fn strategies_agree() {
    let mut m = CMap2::with_config(small());
    m.add_face(5);
    m.add_face(3);
    m.create_embedding::<Vertex>();
    let mut by_darts = Vec::new();
    m.foreach_cell_with(TraversalStrategy::DartMarking, |v: Vertex| by_darts.push(v.dart()));
    let mut by_cells = Vec::new();
    m.foreach_cell_with(TraversalStrategy::CellMarking, |v: Vertex| by_cells.push(v.dart()));
    assert_eq!(by_darts, by_cells);
    assert_eq!(by_darts.len(), 8);
}

#[test]
fn auto_falls_back_to_dart_marking_on_unembedded_darts() {
    let mut m = CMap2::with_config(small());
    m.create_embedding::<Vertex>();
    m.add_face(4);
    let d = CMap2Builder::new(&mut m).add_face_topo_fp(3);
    assert_eq!(m.base().embedding(Orbit::Phi21, d), crate::data::container::INVALID_INDEX);
    assert!(!m.base().is_fully_embedded(Orbit::Phi21));

    let mut auto = Vec::new();
    m.foreach_cell(|v: Vertex| auto.push(v.dart()));
    let mut by_darts = Vec::new();
    m.foreach_cell_with(TraversalStrategy::DartMarking, |v: Vertex| by_darts.push(v.dart()));
    assert_eq!(auto, by_darts);

    CMap2Builder::new(&mut m).close_map();
    assert!(m.base().is_fully_embedded(Orbit::Phi21));
    assert!(m.is_well_embedded::<Vertex>());
}

#[test]
#[should_panic(expected = "is not embedded")]
fn cell_marking_rejects_unembedded_darts() {
    let mut m = CMap2::with_config(small());
    m.create_embedding::<Vertex>();
    CMap2Builder::new(&mut m).add_face_topo_fp(3);
    m.foreach_cell_with(TraversalStrategy::CellMarking, |_: Vertex| {});
}

#[test]
fn early_stop_reports_false() {
    let mut m = CMap2::with_config(small());
    m.add_face_topo(6);
    let mut visited = 0;
    let done = m.foreach_cell_until(|_: Edge| {
        visited += 1;
        visited < 3
    });
    assert!(!done);
    assert_eq!(visited, 3);

    let d = m.base().darts().next().unwrap();
    let mut n = 0;
    let done = m.foreach_dart_of_until(Face(d), |_| {
        n += 1;
        false
    });
    assert!(!done);
    assert_eq!(n, 1);
}

#[test]
fn markers_are_released_after_a_traversal() {
    let mut m = CMap2::with_config(small());
    m.add_face_topo(4);
    for _ in 0..5 {
        m.nb_cells::<Vertex>();
    }
    assert!(m.base().dart_marker_pool().nb_created() <= 2);
}

#[test]
fn scoped_views_traverse_like_the_map() {
    let mut m = CMap2::with_config(small());
    m.add_face_topo(4);
    m.add_face_topo(2);
    let view = m.scoped(WorkerId(1));
    assert_eq!(view.nb_cells::<Face>(), m.nb_cells::<Face>());
    assert_eq!(view.nb_cells::<Vertex>(), 6);
}

#[test]
fn phi_composition_applies_last_digit_last() {
    let mut m = CMap2::with_config(small());
    let d = m.add_face_topo(3);
    assert_eq!(m.phi(d, 11), m.phi1(m.phi1(d)));
    assert_eq!(m.phi(d, 12), m.phi2(m.phi1(d)));
    assert_eq!(m.phi(d, 21), m.phi1(m.phi2(d)));
    assert_eq!(m.phi(d, 1), m.phi1(d));
    assert_eq!(m.phi(d, 0), d);
    assert_eq!(m.phi(d, 10), d);
    assert_eq!(m.phi(d, 102), m.phi2(d));
    assert_eq!(m.phi(d, 1011), m.phi1(m.phi1(d)));
}

#[test]
#[should_panic(expected = "digits 0..=3")]
fn phi_composition_rejects_large_digits() {
    let mut m = CMap2::with_config(small());
    let d = m.add_face_topo(3);
    m.phi(d, 14);
}

#[test]
fn same_cell_and_orbit_darts() {
    let mut m = CMap1::with_config(small());
    let d = m.add_face_topo(4);
    let e = m.phi1(m.phi1(d));
    assert!(m.same_cell(cmap1::Face(d), cmap1::Face(e)));
    assert!(!m.same_cell(cmap1::Vertex(d), cmap1::Vertex(e)));
    let darts: Vec<Dart> = m.orbit_darts(cmap1::Face(d));
    assert_eq!(darts[0], d);
    assert_eq!(darts.len(), 4);
}

#[test]
#[should_panic(expected = "not supported")]
fn unsupported_orbit_panics() {
    let mut m = CMap1::with_config(small());
    let d = m.add_face_topo(2);
    m.foreach_dart_of_orbit(Orbit::Phi2, d, |_| {});
}
