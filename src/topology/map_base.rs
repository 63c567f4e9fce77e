//! Storage shared by every map dimension.
//!
//! [`MapBase`] owns the topology container (one line per dart), one
//! attribute container per orbit kind, the per-dart embedding arrays, the
//! persistent boundary marker and the marker pools. It knows nothing about
//! phi relations beyond their attribute ids: each map layer registers its
//! relations with [`MapBase::add_relation`] and a new dart starts as a fixed
//! point of all of them.

use std::io::{Read, Write};
use std::sync::Arc;

use itertools::Itertools;

use crate::config::MapConfig;
use crate::data::chunk_array::{ChunkArray, read_u32, write_u32};
use crate::data::container::{AttributeContainer, AttributeId, INVALID_INDEX, MarkerId};
use crate::mesh_error::MeshCmapError;
use crate::topology::dart::Dart;
use crate::topology::marker::MarkerPool;
use crate::topology::orbit::{NB_ORBITS, Orbit};

pub struct MapBase {
    config: MapConfig,
    topology: AttributeContainer,
    attributes: [AttributeContainer; NB_ORBITS],
    embeddings: [Option<AttributeId>; NB_ORBITS],
    relations: Vec<(&'static str, AttributeId)>,
    boundary: MarkerId,
    dart_markers: Arc<MarkerPool>,
    cell_markers: [Arc<MarkerPool>; NB_ORBITS],
}

impl std::fmt::Debug for MapBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let embedded = Orbit::ALL
            .into_iter()
            .filter(|o| self.is_embedded(*o))
            .map(Orbit::name)
            .join(", ");
        f.debug_struct("MapBase")
            .field("nb_darts", &self.nb_darts())
            .field("embedded", &format_args!("[{embedded}]"))
            .field("config", &self.config)
            .finish()
    }
}

impl MapBase {
    pub fn new(config: MapConfig) -> Self {
        let chunk = config.chunk_size;
        let workers = config.nb_workers;
        let mut topology = AttributeContainer::new(chunk);
        let boundary = topology.add_marker_attribute();
        Self {
            config,
            topology,
            attributes: std::array::from_fn(|_| AttributeContainer::new(chunk)),
            embeddings: [None; NB_ORBITS],
            relations: Vec::new(),
            boundary,
            dart_markers: Arc::new(MarkerPool::new(chunk, workers)),
            cell_markers: std::array::from_fn(|_| Arc::new(MarkerPool::new(chunk, workers))),
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn topology(&self) -> &AttributeContainer {
        &self.topology
    }

    pub(crate) fn topology_mut(&mut self) -> &mut AttributeContainer {
        &mut self.topology
    }

    /// Container of the cells of `orbit`.
    pub fn attribute_container(&self, orbit: Orbit) -> &AttributeContainer {
        &self.attributes[orbit.index()]
    }

    pub(crate) fn attribute_container_mut(&mut self, orbit: Orbit) -> &mut AttributeContainer {
        &mut self.attributes[orbit.index()]
    }

    pub fn dart_marker_pool(&self) -> Arc<MarkerPool> {
        Arc::clone(&self.dart_markers)
    }

    pub fn cell_marker_pool(&self, orbit: Orbit) -> Arc<MarkerPool> {
        Arc::clone(&self.cell_markers[orbit.index()])
    }

    // ---------------------------------------------------------------------
    // Relations and darts
    // ---------------------------------------------------------------------

    /// Register a dart-valued relation; existing darts become fixed points.
    pub(crate) fn add_relation(&mut self, name: &'static str) -> AttributeId {
        let id = match self.topology.add_attribute::<Dart>(name) {
            Some(id) => id,
            None => panic!("relation `{name}` registered twice"),
        };
        let lines: Vec<u32> = self.topology.lines().collect();
        let rel = self.topology.typed_mut::<Dart>(id);
        for i in lines {
            rel[i] = Dart::new(i);
        }
        self.relations.push((name, id));
        id
    }

    #[inline]
    pub(crate) fn relation(&self, id: AttributeId) -> &ChunkArray<Dart> {
        self.topology.typed::<Dart>(id)
    }

    #[inline]
    pub(crate) fn relation_mut(&mut self, id: AttributeId) -> &mut ChunkArray<Dart> {
        self.topology.typed_mut::<Dart>(id)
    }

    pub(crate) fn relation_id(&self, name: &str) -> Option<AttributeId> {
        self.relations
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, id)| *id)
    }

    /// New dart: fixed point of every relation, every embedding invalid,
    /// not on the boundary.
    pub(crate) fn add_topology_element(&mut self) -> Dart {
        let index = self.topology.insert_lines::<1>();
        let d = Dart::new(index);
        for &(_, id) in &self.relations {
            self.topology.typed_mut::<Dart>(id)[index] = d;
        }
        for id in self.embeddings.iter().flatten() {
            self.topology.typed_mut::<u32>(*id)[index] = INVALID_INDEX;
        }
        d
    }

    /// Free a dart, dropping its references on every embedded cell.
    pub(crate) fn remove_topology_element(&mut self, d: Dart) {
        for orbit in Orbit::ALL {
            if let Some(id) = self.embeddings[orbit.index()] {
                let emb = self.topology.typed::<u32>(id)[d.index()];
                if emb != INVALID_INDEX {
                    self.attributes[orbit.index()].unref_line(emb);
                }
            }
        }
        self.topology.remove_lines::<1>(d.index());
    }

    #[inline]
    pub fn nb_darts(&self) -> usize {
        self.topology.size() as usize
    }

    /// Live darts in index order.
    pub fn darts(&self) -> impl Iterator<Item = Dart> + '_ {
        self.topology.lines().map(Dart::new)
    }

    #[inline]
    pub fn is_boundary(&self, d: Dart) -> bool {
        self.topology.marker(self.boundary)[d.index()]
    }

    #[inline]
    pub(crate) fn set_boundary(&mut self, d: Dart, b: bool) {
        self.topology.marker_mut(self.boundary)[d.index()] = b;
    }

    // ---------------------------------------------------------------------
    // Embeddings
    // ---------------------------------------------------------------------

    #[inline]
    pub fn is_embedded(&self, orbit: Orbit) -> bool {
        self.embeddings[orbit.index()].is_some()
    }

    fn embedding_id(&self, orbit: Orbit) -> AttributeId {
        match self.embeddings[orbit.index()] {
            Some(id) => id,
            None => panic!("orbit {orbit} is not embedded"),
        }
    }

    /// Create the `EMB_<ORBIT>` array with every dart unembedded.
    pub(crate) fn create_embedding(&mut self, orbit: Orbit) {
        if self.is_embedded(orbit) {
            return;
        }
        let id = match self.topology.add_attribute::<u32>(&orbit.embedding_name()) {
            Some(id) => id,
            None => panic!("embedding array for {orbit} already present"),
        };
        self.topology.typed_mut::<u32>(id).fill(INVALID_INDEX);
        self.embeddings[orbit.index()] = Some(id);
    }

    /// Embedding line of `d` for `orbit`, `INVALID_INDEX` if unset.
    #[inline]
    pub fn embedding(&self, orbit: Orbit, d: Dart) -> u32 {
        self.topology.typed::<u32>(self.embedding_id(orbit))[d.index()]
    }

    /// Embedded, and no dart of the orbit is still waiting for a line
    /// (darts created by a builder before `close_map`).
    pub fn is_fully_embedded(&self, orbit: Orbit) -> bool {
        self.is_embedded(orbit) && self.darts().all(|d| self.embedding(orbit, d) != INVALID_INDEX)
    }

    /// Point `d` at `emb`, moving one reference from the old line.
    pub(crate) fn set_embedding(&mut self, orbit: Orbit, d: Dart, emb: u32) {
        let id = self.embedding_id(orbit);
        let old = self.topology.typed::<u32>(id)[d.index()];
        if old == emb {
            return;
        }
        let cells = &mut self.attributes[orbit.index()];
        if emb != INVALID_INDEX {
            cells.ref_line(emb);
        }
        if old != INVALID_INDEX {
            cells.unref_line(old);
        }
        self.topology.typed_mut::<u32>(id)[d.index()] = emb;
    }

    /// Like [`set_embedding`](Self::set_embedding) for a dart known to be unembedded.
    pub(crate) fn init_embedding(&mut self, orbit: Orbit, d: Dart, emb: u32) {
        let id = self.embedding_id(orbit);
        debug_assert_eq!(
            self.topology.typed::<u32>(id)[d.index()],
            INVALID_INDEX,
            "init_embedding on an embedded dart"
        );
        self.attributes[orbit.index()].ref_line(emb);
        self.topology.typed_mut::<u32>(id)[d.index()] = emb;
    }

    /// Allocate a fresh cell line in `orbit`'s container.
    pub(crate) fn new_embedding_line(&mut self, orbit: Orbit) -> u32 {
        let cells = &mut self.attributes[orbit.index()];
        let line = cells.insert_lines::<1>();
        cells.init_line(line);
        line
    }

    // ---------------------------------------------------------------------
    // Compaction
    // ---------------------------------------------------------------------

    /// Compact the topology container and rewrite every relation.
    /// Returns the old → new dart index map.
    pub fn compact_topology(&mut self) -> Vec<u32> {
        let map = self.topology.compact::<1>();
        let lines: Vec<u32> = self.topology.lines().collect();
        for &(_, id) in &self.relations {
            let rel = self.topology.typed_mut::<Dart>(id);
            for &i in &lines {
                let old = rel[i].index();
                rel[i] = Dart::new(map[old as usize]);
            }
        }
        map
    }

    /// Compact the container of `orbit` and rewrite the dart embeddings.
    pub fn compact_orbit(&mut self, orbit: Orbit) -> Vec<u32> {
        let map = self.attributes[orbit.index()].compact::<1>();
        if let Some(id) = self.embeddings[orbit.index()] {
            let lines: Vec<u32> = self.topology.lines().collect();
            let embs = self.topology.typed_mut::<u32>(id);
            for i in lines {
                let old = embs[i];
                if old != INVALID_INDEX {
                    embs[i] = map[old as usize];
                }
            }
        }
        map
    }

    /// Compact the topology and every embedded orbit.
    pub fn compact(&mut self) {
        self.compact_topology();
        for orbit in Orbit::ALL {
            if self.is_embedded(orbit) {
                self.compact_orbit(orbit);
            }
        }
    }

    /// Remove every dart and cell; attributes are kept.
    pub fn clear(&mut self) {
        self.topology.clear_attributes();
        for c in &mut self.attributes {
            c.clear_attributes();
        }
    }

    // ---------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------

    /// `[embedded orbit bitmask u32][topology][one container per embedded orbit]`
    pub fn save<W: Write + ?Sized>(&self, w: &mut W) -> Result<(), MeshCmapError> {
        let mask = Orbit::ALL
            .into_iter()
            .filter(|o| self.is_embedded(*o))
            .fold(0u32, |m, o| m | (1 << o.index()));
        write_u32(w, mask)?;
        self.topology.save(w)?;
        for orbit in Orbit::ALL {
            if self.is_embedded(orbit) {
                self.attributes[orbit.index()].save(w)?;
            }
        }
        Ok(())
    }

    /// Reload a map saved by [`save`](Self::save). Relation and embedding
    /// handles are re-resolved by name; user attribute handles are stale
    /// afterwards and must be looked up again.
    pub fn load<R: Read + ?Sized>(&mut self, r: &mut R) -> Result<(), MeshCmapError> {
        let mask = read_u32(r)?;
        self.topology.load(r)?;

        for (name, id) in &mut self.relations {
            *id = self.topology.get_attribute::<Dart>(*name).ok_or_else(|| {
                MeshCmapError::CorruptedContainer(format!("relation `{name}` missing"))
            })?;
        }
        self.embeddings = [None; NB_ORBITS];
        for c in &mut self.attributes {
            c.remove_attributes();
        }
        for orbit in Orbit::ALL {
            if mask & (1 << orbit.index()) == 0 {
                continue;
            }
            let id = self
                .topology
                .get_attribute::<u32>(&orbit.embedding_name())
                .ok_or_else(|| {
                    MeshCmapError::CorruptedContainer(format!("embedding of {orbit} missing"))
                })?;
            self.embeddings[orbit.index()] = Some(id);
            self.attributes[orbit.index()].load(r)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> MapBase {
        MapBase::new(MapConfig::default().with_chunk_size(4).with_workers(1))
    }

    #[test]
    fn new_darts_are_fixed_points() {
        let mut b = base();
        let phi = b.add_relation("phi");
        let d = b.add_topology_element();
        let e = b.add_topology_element();
        assert_eq!(b.relation(phi)[d.index()], d);
        assert_eq!(b.relation(phi)[e.index()], e);
        assert!(!b.is_boundary(e));
        assert_eq!(b.nb_darts(), 2);
    }

    #[test]
    fn embedding_refcount_tracks_darts() {
        let mut b = base();
        let d = b.add_topology_element();
        let e = b.add_topology_element();
        b.create_embedding(Orbit::Phi1);
        assert_eq!(b.embedding(Orbit::Phi1, d), INVALID_INDEX);

        let line = b.new_embedding_line(Orbit::Phi1);
        b.set_embedding(Orbit::Phi1, d, line);
        b.set_embedding(Orbit::Phi1, e, line);
        assert_eq!(b.attribute_container(Orbit::Phi1).nb_refs(line), 3);

        b.remove_topology_element(d);
        assert_eq!(b.attribute_container(Orbit::Phi1).nb_refs(line), 2);
        b.remove_topology_element(e);
        assert!(!b.attribute_container(Orbit::Phi1).used(line));
    }

    #[test]
    fn compaction_rewrites_relations_and_embeddings() {
        let mut b = base();
        let phi = b.add_relation("phi");
        b.create_embedding(Orbit::Dart);
        let darts: Vec<Dart> = (0..6).map(|_| b.add_topology_element()).collect();
        // phi pairs (4 5), cells one per dart
        b.relation_mut(phi)[4] = darts[5];
        b.relation_mut(phi)[5] = darts[4];
        for &d in &darts {
            let line = b.new_embedding_line(Orbit::Dart);
            b.set_embedding(Orbit::Dart, d, line);
        }
        b.remove_topology_element(darts[0]);
        b.remove_topology_element(darts[1]);
        b.compact();
        assert_eq!(b.topology().nb_max(), 4);
        for d in b.darts() {
            let p = b.relation(phi)[d.index()];
            assert_eq!(b.relation(phi)[p.index()], d);
            assert!(b.embedding(Orbit::Dart, d) < 4);
        }
    }

    #[test]
    fn save_load_roundtrip() {
        let mut b = base();
        let phi = b.add_relation("phi");
        b.create_embedding(Orbit::Phi1);
        let d = b.add_topology_element();
        let e = b.add_topology_element();
        b.relation_mut(phi)[d.index()] = e;
        b.relation_mut(phi)[e.index()] = d;
        b.set_boundary(e, true);
        let line = b.new_embedding_line(Orbit::Phi1);
        b.set_embedding(Orbit::Phi1, d, line);

        let mut out = Vec::new();
        b.save(&mut out).unwrap();

        let mut c = base();
        c.add_relation("phi");
        c.load(&mut &out[..]).unwrap();
        let phi = c.relation_id("phi").unwrap();
        assert_eq!(c.nb_darts(), 2);
        assert_eq!(c.relation(phi)[d.index()], e);
        assert!(c.is_boundary(e));
        assert_eq!(c.embedding(Orbit::Phi1, d), line);
        assert_eq!(c.attribute_container(Orbit::Phi1).nb_refs(line), 2);
    }
}
