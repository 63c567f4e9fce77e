//! Map-wide configuration.
//!
//! A [`MapConfig`] is fixed when a map is created: the chunk size of every
//! attribute container and the number of worker slots available to the
//! marker pools. Maps built with [`Default`] use 4096-element chunks and a
//! single worker slot per available CPU.

use serde::{Deserialize, Serialize};

/// Default number of elements per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Number of lines per chunk in every container of the map.
    pub chunk_size: usize,
    /// Number of worker slots; traversals must use `WorkerId(i)` with `i < nb_workers`.
    pub nb_workers: usize,
}

impl Default for MapConfig {
    fn default() -> Self {
        let nb_workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            nb_workers,
        }
    }
}

impl MapConfig {
    /// Override the chunk size.
    ///
    /// # Panics
    /// Panics if `chunk_size == 0`.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be positive");
        self.chunk_size = chunk_size;
        self
    }

    /// Override the number of worker slots (at least one).
    pub fn with_workers(mut self, nb_workers: usize) -> Self {
        self.nb_workers = nb_workers.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_one_worker_at_least() {
        let cfg = MapConfig::default();
        assert_eq!(cfg.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(cfg.nb_workers >= 1);
    }

    #[test]
    fn builder_setters() {
        let cfg = MapConfig::default().with_chunk_size(16).with_workers(0);
        assert_eq!(cfg.chunk_size, 16);
        assert_eq!(cfg.nb_workers, 1);
    }

    #[test]
    fn json_roundtrip() {
        let cfg = MapConfig::default().with_chunk_size(64).with_workers(3);
        let s = serde_json::to_string(&cfg).unwrap();
        let back: MapConfig = serde_json::from_str(&s).unwrap();
        assert_eq!(back, cfg);
    }
}
