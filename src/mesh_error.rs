//! MeshCmapError: unified error type for mesh-cmap public APIs
//!
//! Low-level topological primitives assert their preconditions; everything
//! that can fail for reasons outside the caller's control (I/O, corrupted
//! payloads, open maps handed to closed-map algorithms) reports through this
//! enum instead.

use thiserror::Error;

use crate::topology::dart::Dart;
use crate::topology::orbit::Orbit;

/// Unified error type for mesh-cmap operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshCmapError {
    /// Underlying reader or writer failed.
    #[error("I/O error: {0}")]
    Io(String),
    /// A serialized payload ended before the announced number of elements.
    #[error("truncated payload: expected {expected} bytes, found {found}")]
    TruncatedPayload { expected: usize, found: usize },
    /// An attribute name or type name in a saved container is not valid.
    #[error("invalid attribute name in saved container: {0}")]
    InvalidName(String),
    /// Saved container header is inconsistent with its payloads.
    #[error("corrupted container: {0}")]
    CorruptedContainer(String),
    /// The operation requires a map without boundary (every phi2 sewn).
    #[error("map has boundary darts; a closed map is required")]
    OpenMap,
    /// A relation violates the permutation/involution invariants at a dart.
    #[error("topological integrity violated at {0:?}")]
    BrokenRelation(Dart),
    /// Boundary marks are not uniform across a face or an edge.
    #[error("boundary marks are inconsistent at {0:?}")]
    BrokenBoundary(Dart),
    /// Darts of a cell disagree on their embedding, or refcounts drifted.
    #[error("orbit {0} is not well embedded")]
    BadEmbedding(Orbit),
    /// Container bookkeeping (used count, holes, refs) is inconsistent.
    #[error("container bookkeeping mismatch: {0}")]
    ContainerMismatch(String),
}

impl From<std::io::Error> for MeshCmapError {
    fn from(e: std::io::Error) -> Self {
        MeshCmapError::Io(e.to_string())
    }
}
