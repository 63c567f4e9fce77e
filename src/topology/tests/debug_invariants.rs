#![cfg(any(debug_assertions, feature = "strict-invariants", feature = "check-invariants"))]

use crate::DebugInvariants;
use crate::config::MapConfig;
use crate::topology::cell::Cell;
use crate::topology::cmap2::{CMap2, Vertex};
use crate::topology::embedding::Embedding;
use crate::topology::map::Topology;

fn map() -> CMap2 {
    CMap2::with_config(MapConfig::default().with_chunk_size(8).with_workers(1))
}

#[test]
fn fresh_maps_pass() {
    let mut m = map();
    m.add_face(4);
    m.create_embedding::<Vertex>();
    m.debug_assert_invariants();
}

#[test]
#[should_panic(expected = "[invariants] CMap2")]
fn broken_phi2_panics_in_debug() {
    let mut m = map();
    let d = m.add_face_topo(3);
    let phi2 = m.base().relation_id("phi2").unwrap();
    m.base_mut().relation_mut(phi2)[d.index()] = d;
    m.debug_assert_invariants();
}

#[test]
#[should_panic]
fn split_embedding_panics_in_debug() {
    let mut m = map();
    let d = m.add_face_topo(3);
    m.create_embedding::<Vertex>();
    let line = m.base_mut().new_embedding_line(Vertex::ORBIT);
    m.base_mut().set_embedding(Vertex::ORBIT, d, line);
    m.debug_assert_invariants();
}

#[test]
fn checks_are_enabled_in_this_build() {
    assert!(crate::debug_invariants::INVARIANTS_ENABLED);
}
