//! Opt-in consistency checks for containers and maps.
//!
//! [`DebugInvariants::validate_invariants`] is always available and returns
//! the first violation. [`DebugInvariants::debug_assert_invariants`] turns a
//! violation into a panic, but only when [`INVARIANTS_ENABLED`] is set: in
//! debug builds, or with the `check-invariants` or `strict-invariants`
//! feature.

use crate::mesh_error::MeshCmapError;

/// Whether `debug_assert_invariants` runs its checks in this build.
pub const INVARIANTS_ENABLED: bool = cfg!(any(
    debug_assertions,
    feature = "strict-invariants",
    feature = "check-invariants"
));

pub trait DebugInvariants {
    /// Label used in panic messages.
    const LABEL: &'static str;

    /// First broken relation, boundary mark, embedding or line count.
    fn validate_invariants(&self) -> Result<(), MeshCmapError>;

    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), Self::LABEL);
    }
}

/// Panic with `label` and the error if `check` fails and checks are enabled.
#[macro_export]
macro_rules! debug_invariants {
    ($check:expr, $label:expr) => {
        if $crate::debug_invariants::INVARIANTS_ENABLED {
            if let Err(e) = $check {
                panic!("[invariants] {}: {}", $label, e);
            }
        }
    };
}
