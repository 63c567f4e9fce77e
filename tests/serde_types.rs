use mesh_cmap::prelude::*;

#[test]
fn config_json_roundtrip() {
    let cfg = MapConfig::default().with_chunk_size(256).with_workers(3);
    let json = serde_json::to_string(&cfg).unwrap();
    assert!(json.contains("\"chunk_size\":256"));
    let back: MapConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cfg);
}

#[test]
fn orbit_and_dart_bincode_roundtrip() {
    for orbit in Orbit::ALL {
        let bytes = bincode::serialize(&orbit).unwrap();
        let back: Orbit = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, orbit);
    }
    let darts = vec![Dart::new(0), Dart::new(41), Dart::INVALID];
    let bytes = bincode::serialize(&darts).unwrap();
    let back: Vec<Dart> = bincode::deserialize(&bytes).unwrap();
    assert_eq!(back, darts);
}

#[test]
fn maps_remember_their_config() {
    let cfg = MapConfig::default().with_chunk_size(32).with_workers(2);
    let map = CMap3::with_config(cfg);
    assert_eq!(*map.base().config(), cfg);
    assert_eq!(map.base().topology().chunk_size(), 32);
}
