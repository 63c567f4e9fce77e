//! The `Topology` trait: what every map dimension provides.
//!
//! A map type exposes its [`MapBase`] and its permutations; everything else
//! (orbit traversal, cell enumeration, embeddings, integrity checks) is
//! written once against this trait in [`traversal`](crate::topology::traversal)
//! and [`embedding`](crate::topology::embedding).

use std::io::{Read, Write};

use crate::mesh_error::MeshCmapError;
use crate::topology::dart::Dart;
use crate::topology::map_base::MapBase;
use crate::topology::marker::WorkerId;
use crate::topology::orbit::Orbit;

pub trait Topology: Sized + Send + Sync {
    /// Topological dimension (1, 2 or 3).
    const DIMENSION: usize;

    fn base(&self) -> &MapBase;
    fn base_mut(&mut self) -> &mut MapBase;

    fn phi1(&self, d: Dart) -> Dart;
    fn phi_1(&self, d: Dart) -> Dart;

    /// Identity below dimension 2.
    #[inline]
    fn phi2(&self, d: Dart) -> Dart {
        d
    }

    /// Identity below dimension 3.
    #[inline]
    fn phi3(&self, d: Dart) -> Dart {
        d
    }

    /// Whether `orbit` can be traversed in this map.
    fn supports(orbit: Orbit) -> bool;

    /// Local relation invariants at `d`.
    fn check_dart_integrity(&self, d: Dart) -> bool;

    /// Local boundary-mark invariants at `d`.
    fn check_boundary_integrity(&self, _d: Dart) -> bool {
        true
    }

    /// Re-resolve relation handles after the base was reloaded.
    fn refresh_handles(&mut self) -> Result<(), MeshCmapError>;

    /// Composition of permutations by decimal digits, the least significant
    /// digit applied last: `phi(d, 21) == phi1(phi2(d))`. A 0 digit restarts
    /// from `d`, dropping the digits before it: `phi(d, 102) == phi2(d)`.
    ///
    /// # Panics
    /// Panics on a digit above 3.
    fn phi(&self, d: Dart, n: u32) -> Dart {
        match n % 10 {
            0 => d,
            1 => self.phi1(self.phi(d, n / 10)),
            2 => self.phi2(self.phi(d, n / 10)),
            3 => self.phi3(self.phi(d, n / 10)),
            digit => panic!("phi composition only accepts digits 0..=3, got {digit}"),
        }
    }

    #[inline]
    fn is_boundary(&self, d: Dart) -> bool {
        self.base().is_boundary(d)
    }

    /// Borrow the map for traversals on worker slot `worker`.
    fn scoped(&self, worker: WorkerId) -> Scoped<'_, Self> {
        Scoped::new(self, worker)
    }

    /// Fill every container's holes and shrink its arrays.
    fn compact(&mut self) {
        self.base_mut().compact();
    }

    fn save<W: Write + ?Sized>(&self, w: &mut W) -> Result<(), MeshCmapError> {
        self.base().save(w)
    }

    fn load<R: Read + ?Sized>(&mut self, r: &mut R) -> Result<(), MeshCmapError> {
        self.base_mut().load(r)?;
        self.refresh_handles()
    }
}

/// A map seen through an explicit worker slot.
///
/// Read-only traversals from several threads must each use their own slot:
/// `map.scoped(WorkerId(i))`.
#[derive(Debug)]
pub struct Scoped<'a, M> {
    map: &'a M,
    worker: WorkerId,
}

impl<M> Clone for Scoped<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for Scoped<'_, M> {}

impl<'a, M: Topology> Scoped<'a, M> {
    /// # Panics
    /// Panics if `worker` exceeds the map's configured worker slots.
    pub fn new(map: &'a M, worker: WorkerId) -> Self {
        let nb = map.base().config().nb_workers;
        assert!(worker.0 < nb, "worker {} out of range ({nb} slots)", worker.0);
        Self { map, worker }
    }

    pub fn inner(&self) -> &'a M {
        self.map
    }

    pub fn worker_id(&self) -> WorkerId {
        self.worker
    }
}
