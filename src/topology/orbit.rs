//! Orbit kinds.
//!
//! An orbit is the set of darts reachable from a dart by a fixed group of
//! permutations. Each cell kind of a map is one orbit kind; the table of
//! which orbit backs which cell lives with each map type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of orbit kinds.
pub const NB_ORBITS: usize = 9;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Orbit {
    /// The dart alone.
    Dart,
    /// phi1 cycle.
    Phi1,
    /// A dart and its phi2 image.
    Phi2,
    /// Closure under phi1 and phi2 (2-connected component).
    Phi1Phi2,
    /// phi1 cycle together with its phi3 image (3D face).
    Phi1Phi3,
    /// Alternating phi2 / phi3 (3D edge).
    Phi2Phi3,
    /// Iterated phi2 ∘ phi_1 (2D vertex).
    Phi21,
    /// Closure under phi1, phi2 and phi3 (connected component).
    Phi1Phi2Phi3,
    /// Closure under phi2 ∘ phi_1 and phi3 ∘ phi_1 (3D vertex).
    Phi21Phi31,
}

impl Orbit {
    pub const ALL: [Orbit; NB_ORBITS] = [
        Orbit::Dart,
        Orbit::Phi1,
        Orbit::Phi2,
        Orbit::Phi1Phi2,
        Orbit::Phi1Phi3,
        Orbit::Phi2Phi3,
        Orbit::Phi21,
        Orbit::Phi1Phi2Phi3,
        Orbit::Phi21Phi31,
    ];

    /// Dense index in `0..NB_ORBITS`.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Orbit::Dart => "DART",
            Orbit::Phi1 => "PHI1",
            Orbit::Phi2 => "PHI2",
            Orbit::Phi1Phi2 => "PHI1_PHI2",
            Orbit::Phi1Phi3 => "PHI1_PHI3",
            Orbit::Phi2Phi3 => "PHI2_PHI3",
            Orbit::Phi21 => "PHI21",
            Orbit::Phi1Phi2Phi3 => "PHI1_PHI2_PHI3",
            Orbit::Phi21Phi31 => "PHI21_PHI31",
        }
    }

    /// Name of the per-dart attribute holding this orbit's embedding.
    pub fn embedding_name(self) -> String {
        format!("EMB_{}", self.name())
    }
}

impl fmt::Display for Orbit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_dense() {
        for (i, o) in Orbit::ALL.iter().enumerate() {
            assert_eq!(o.index(), i);
        }
    }

    #[test]
    fn names() {
        assert_eq!(Orbit::Phi21Phi31.to_string(), "PHI21_PHI31");
        assert_eq!(Orbit::Phi1.embedding_name(), "EMB_PHI1");
    }
}
