mod util;

use mesh_cmap::prelude::*;
use mesh_cmap::topology::cmap3::{ConnectedComponent, Edge, Face, Face2, Vertex, Volume};
use util::config;

fn counts(map: &CMap3) -> (usize, usize, usize, usize) {
    (
        map.nb_cells::<Vertex>(),
        map.nb_cells::<Edge>(),
        map.nb_cells::<Face>(),
        map.nb_cells::<Volume>(),
    )
}

#[test]
fn pyramid_is_wrapped_in_a_boundary_volume() {
    let mut map = CMap3::with_config(config());
    let vol = map.add_pyramid(4);
    assert_eq!(map.nb_darts(), 32);
    assert_eq!(counts(&map), (5, 8, 5, 2));
    assert_eq!(map.nb_cells::<ConnectedComponent>(), 1);
    assert!(map.check_map_integrity());
    assert!(map.is_adjacent_to_boundary(vol));
    assert_eq!(map.incident::<Volume, Face>(vol).len(), 5);
    assert_eq!(map.incident::<Volume, Vertex>(vol).len(), 5);
    assert!(map.adjacent::<Volume, Face>(vol).is_empty());
    for f in map.incident::<Volume, Face>(vol) {
        assert_eq!(map.degree(f), 1);
    }
    let degrees: Vec<usize> = map
        .incident::<Volume, Vertex>(vol)
        .into_iter()
        .map(|v| map.degree(v))
        .collect();
    util::assert_permutation(&degrees, &[3, 3, 3, 3, 4]);
}

#[test]
fn prism_counts() {
    let mut map = CMap3::with_config(config());
    let vol = map.add_prism(4);
    assert_eq!(counts(&map), (8, 12, 6, 2));
    assert_eq!(map.codegree(Face(vol.dart())), 4);
    for e in map.cells::<Edge>() {
        assert_eq!(map.codegree(e), 2);
        assert_eq!(map.degree(e), 2);
    }
}

#[test]
fn unclosed_volume_fails_integrity_until_closed() {
    let mut map = CMap3::with_config(config());
    let pos = map.add_attribute::<[f64; 3], Vertex>("position").unwrap();
    let d = {
        let mut b = CMap3Builder::new(&mut map);
        b.add_prism_topo(3)
    };
    assert!(map.check_topology().is_err());
    let holes = CMap3Builder::new(&mut map).close_map();
    assert_eq!(holes, 1);
    assert!(map.check_map_integrity());
    assert_eq!(map.base().attribute_container(Orbit::Phi21Phi31).size(), 6);
    map.set_attribute(&pos, Vertex(d), [0.0, 0.0, 1.0]);
    assert_eq!(map.attribute(&pos, Vertex(d))[2], 1.0);
}

#[test]
fn sewn_tetrahedra_share_a_face() {
    let mut map = CMap3::with_config(config());
    let (a, b) = {
        let mut b = CMap3Builder::new(&mut map);
        let t1 = b.add_pyramid_topo(3);
        let t2 = b.add_pyramid_topo(3);
        b.sew_volumes(t1, t2);
        assert_eq!(b.close_map(), 1);
        (t1, t2)
    };
    assert!(map.check_map_integrity());
    assert_eq!(counts(&map), (5, 9, 7, 3));
    assert!(map.same_cell(Face(a), Face(b)));
    assert_eq!(map.degree(Face(a)), 2);
    let v = Volume(a);
    let across = map.adjacent::<Volume, Face>(v);
    assert_eq!(across.len(), 1);
    assert!(map.same_cell(across[0], Volume(b)));
    assert_eq!(map.adjacent::<Volume, Vertex>(v).len(), 1);
    assert_eq!(map.incident::<Face, Volume>(Face(a)).len(), 2);
}

#[test]
#[should_panic(expected = "different sizes")]
fn sewing_mismatched_faces_panics() {
    let mut map = CMap3::with_config(config());
    let mut b = CMap3Builder::new(&mut map);
    let t = b.add_pyramid_topo(3);
    let p = b.add_prism_topo(4);
    b.sew_volumes(t, p);
}

#[test]
fn stamp_volume_closes_to_one_volume() {
    let mut map = CMap3::with_config(config());
    let mut b = CMap3Builder::new(&mut map);
    let d = b.add_stamp_volume_topo();
    let boundary = b.close_hole(d);
    assert!(map.is_boundary(boundary.dart()));
    assert!(map.check_topology().is_ok());
    assert_eq!(map.nb_darts_of(Volume(d)), 10);
    assert_eq!(map.nb_cells::<Face2>(), 6);
}

#[test]
fn cut_edge_and_face_on_a_cube() {
    let mut map = CMap3::with_config(config());
    let vol = map.add_prism(4);
    let d = vol.dart();

    map.cut_edge_topo(d);
    assert!(map.check_topology().is_ok());
    assert_eq!(counts(&map), (9, 13, 6, 2));

    let top = map
        .cells::<Face>()
        .into_iter()
        .map(|f| f.dart())
        .find(|&x| !map.is_boundary(x) && map.codegree(Face(x)) == 4)
        .unwrap();
    map.cut_face_topo(top, map.phi(top, 11));
    assert!(map.check_topology().is_ok());
    assert_eq!(counts(&map), (9, 14, 7, 2));
}
