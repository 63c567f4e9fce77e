mod util;

use mesh_cmap::prelude::*;
use mesh_cmap::topology::cmap2::{Edge, Face, Vertex};
use util::{config, prism_surface};

#[test]
fn refcount_is_darts_plus_one() {
    let mut map = prism_surface(4);
    map.create_embedding::<Vertex>();
    map.create_embedding::<Face>();
    for v in map.cells::<Vertex>() {
        let line = map.embedding(v);
        let refs = map.base().attribute_container(Orbit::Phi21).nb_refs(line);
        assert_eq!(refs as usize, map.nb_darts_of(v) + 1);
    }
    let d = map.base().darts().next().unwrap();
    map.cut_edge(Edge(d));
    for f in map.cells::<Face>() {
        let refs = map.base().attribute_container(Orbit::Phi1).nb_refs(map.embedding(f));
        assert_eq!(refs as usize, map.nb_darts_of(f) + 1);
    }
    assert!(map.check_embedding_integrity());
}

#[test]
fn lines_are_reclaimed_when_cells_disappear() {
    let mut map = prism_surface(4);
    map.create_embedding::<Vertex>();
    let container = |m: &CMap2| m.base().attribute_container(Orbit::Phi21).size();
    assert_eq!(container(&map), 8);
    let d = map.base().darts().next().unwrap();
    map.collapse_edge(Edge(d));
    assert_eq!(container(&map), 7);
    assert!(map.is_well_embedded::<Vertex>());
}

#[test]
fn attributes_by_name() {
    let mut map = CMap2::with_config(config());
    map.add_face(3);
    let h = map.add_attribute::<u32, Vertex>("label").unwrap();
    assert!(map.add_attribute::<u32, Vertex>("label").is_none());
    assert!(map.add_attribute::<f32, Face>("").is_none());
    assert_eq!(map.get_attribute::<u32, Vertex>("label"), Some(h));
    assert!(map.get_attribute::<f64, Vertex>("label").is_none());
    assert!(map.get_attribute::<u32, Vertex>("missing").is_none());
}

#[test]
fn removed_handles_are_invalid() {
    let mut map = CMap2::with_config(config());
    let f = map.add_face(3);
    let h = map.add_attribute::<f64, Face>("area").unwrap();
    map.set_attribute(&h, f, 4.0);
    assert_eq!(map.try_attribute(&h, f), Some(&4.0));
    assert!(map.remove_attribute(h));
    assert!(!map.is_valid(&h));
    assert!(map.try_attribute(&h, f).is_none());
    assert!(!map.remove_attribute(h));

    let again = map.add_attribute::<f64, Face>("area").unwrap();
    assert_ne!(again, h);
    assert!(map.is_valid(&again));
}

#[test]
#[should_panic(expected = "used after removal")]
fn stale_handle_panics() {
    let mut map = CMap2::with_config(config());
    let f = map.add_face(3);
    let h = map.add_attribute::<f64, Face>("area").unwrap();
    map.remove_attribute(h);
    map.attribute(&h, f);
}

#[test]
fn unembedded_cells_have_no_value() {
    let mut map = CMap2::with_config(config());
    let f = map.add_face(4);
    let h = map.add_attribute::<f64, Face>("area").unwrap();
    {
        let mut b = CMap2Builder::new(&mut map);
        b.add_face_topo_fp(3);
    }
    let loose = map
        .base()
        .darts()
        .find(|&d| map.embedding(Face(d)) == mesh_cmap::data::INVALID_INDEX)
        .unwrap();
    assert!(map.try_attribute(&h, Face(loose)).is_none());
    assert!(map.try_attribute(&h, f).is_some());
}

#[test]
fn complete_embeddings_shares_existing_lines() {
    let mut map = CMap2::with_config(config());
    map.create_embedding::<Vertex>();
    map.create_embedding::<Edge>();
    {
        let mut b = CMap2Builder::new(&mut map);
        let t1 = b.add_face_topo_fp(3);
        let t2 = b.add_face_topo_fp(3);
        b.phi2_sew(t1, t2);
        assert_eq!(b.close_map(), 1);
    }
    assert!(map.check_map_integrity());
    assert_eq!(map.nb_cells::<Vertex>(), 4);
    assert_eq!(map.base().attribute_container(Orbit::Phi21).size(), 4);
    assert_eq!(map.base().attribute_container(Orbit::Phi2).size(), 5);
}
