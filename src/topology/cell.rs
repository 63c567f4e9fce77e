//! Typed cells.
//!
//! A cell is an orbit represented by one of its darts. Each map module
//! defines its own cell types with [`define_cell!`], so a `cmap2::Vertex` and
//! a `cmap3::Vertex` are distinct types even though both wrap a [`Dart`].

use std::fmt::Debug;

use crate::topology::dart::Dart;
use crate::topology::orbit::Orbit;

/// A cell kind of some map, tied to one orbit.
pub trait Cell: Copy + Eq + Debug + Send + Sync + 'static {
    const ORBIT: Orbit;

    fn from_dart(d: Dart) -> Self;

    /// Representative dart.
    fn dart(self) -> Dart;
}

/// Declare a cell newtype bound to an orbit.
#[macro_export]
macro_rules! define_cell {
    ($(#[$meta:meta])* $name:ident => $orbit:expr) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $name(pub $crate::topology::dart::Dart);

        impl $crate::topology::cell::Cell for $name {
            const ORBIT: $crate::topology::orbit::Orbit = $orbit;

            #[inline]
            fn from_dart(d: $crate::topology::dart::Dart) -> Self {
                $name(d)
            }

            #[inline]
            fn dart(self) -> $crate::topology::dart::Dart {
                self.0
            }
        }

        impl From<$crate::topology::dart::Dart> for $name {
            fn from(d: $crate::topology::dart::Dart) -> Self {
                $name(d)
            }
        }
    };
}

define_cell!(
    /// Cell made of a single dart; embeds per-dart data.
    CDart => Orbit::Dart
);
