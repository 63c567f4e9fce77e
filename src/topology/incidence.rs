//! Incidence, adjacency and degree traits.
//!
//! Each map module implements these for its own cell types, for every
//! [`Traversal`] whose `Map` is that map type, so the same queries work on a
//! map directly and on a [`Scoped`](crate::topology::map::Scoped) view.
//!
//! ```ignore
//! map.foreach_incident(v, |e: Edge| { /* ... */ });
//! let ring: Vec<Vertex> = map.adjacent::<Vertex, Edge>(v);
//! ```
//!
//! Boundary faces (2D) and boundary volumes (3D) are never reported as
//! incident or adjacent cells.

use crate::topology::cell::Cell;
use crate::topology::map::Topology;
use crate::topology::traversal::Traversal;

/// Cells of kind `To` incident to a cell of kind `Of`.
pub trait Incident<Of: Cell, To: Cell>: Traversal {
    /// Returns `false` if `f` stopped the enumeration.
    fn foreach_incident_until<F: FnMut(To) -> bool>(&self, c: Of, f: F) -> bool;
}

/// Cells of kind `C` sharing a `Through` cell with a given `C` cell.
pub trait Adjacent<C: Cell, Through: Cell>: Traversal {
    /// Returns `false` if `f` stopped the enumeration.
    fn foreach_adjacent_until<F: FnMut(C) -> bool>(&self, c: C, f: F) -> bool;
}

/// Number of incident cells of the next dimension (edges of a vertex,
/// faces of an edge, volumes of a face).
pub trait Degree<C: Cell> {
    fn degree(&self, c: C) -> usize;
}

/// Number of incident cells of the previous dimension (vertices of an edge,
/// edges of a face, faces of a volume).
pub trait Codegree<C: Cell> {
    fn codegree(&self, c: C) -> usize;

    fn has_codegree(&self, c: C, k: usize) -> bool {
        self.codegree(c) == k
    }
}

/// `To` cells met along the darts of `c`, each reported once. With
/// `skip_boundary`, darts on the boundary are ignored.
pub(crate) fn incident_by_darts<T, Of, To, F>(t: &T, c: Of, skip_boundary: bool, mut f: F) -> bool
where
    T: Traversal,
    Of: Cell,
    To: Cell,
    F: FnMut(To) -> bool,
{
    let m = t.map();
    let mut marker = t.dart_marker_store();
    t.foreach_dart_of_until(c, |d| {
        if marker.is_marked(d) || (skip_boundary && m.is_boundary(d)) {
            return true;
        }
        t.foreach_dart_of_orbit(To::ORBIT, d, |e| marker.mark(e));
        f(To::from_dart(d))
    })
}

/// `C` cells reached through the `Through` cells of `c`, `c` itself and
/// duplicates excluded.
pub(crate) fn adjacent_through<T, C, Through, F>(t: &T, c: C, mut f: F) -> bool
where
    T: Incident<C, Through> + Incident<Through, C>,
    C: Cell,
    Through: Cell,
    F: FnMut(C) -> bool,
{
    let mut marker = t.dart_marker_store();
    t.foreach_dart_of(c, |d| marker.mark(d));
    Incident::<C, Through>::foreach_incident_until(t, c, |through: Through| {
        Incident::<Through, C>::foreach_incident_until(t, through, |other: C| {
            if marker.is_marked(other.dart()) {
                return true;
            }
            t.foreach_dart_of(other, |d| marker.mark(d));
            f(other)
        })
    })
}

/// `impl Incident<Of, To>` for every traversal of one map type, through
/// [`incident_by_darts`].
macro_rules! impl_incident {
    (@skip skip_boundary) => { true };
    (@skip) => { false };
    ($map:ty { $($of:ty => $to:ty $(, $skip:ident)?;)* }) => {
        $(
            impl<T: $crate::topology::traversal::Traversal<Map = $map>>
                $crate::topology::incidence::Incident<$of, $to> for T
            {
                fn foreach_incident_until<F: FnMut($to) -> bool>(&self, c: $of, f: F) -> bool {
                    $crate::topology::incidence::incident_by_darts(
                        self,
                        c,
                        $crate::topology::incidence::impl_incident!(@skip $($skip)?),
                        f,
                    )
                }
            }
        )*
    };
}

/// `impl Adjacent<C, Through>` for every traversal of one map type, through
/// [`adjacent_through`].
macro_rules! impl_adjacent {
    ($map:ty { $($c:ty => $through:ty;)* }) => {
        $(
            impl<T: $crate::topology::traversal::Traversal<Map = $map>>
                $crate::topology::incidence::Adjacent<$c, $through> for T
            {
                fn foreach_adjacent_until<F: FnMut($c) -> bool>(&self, c: $c, f: F) -> bool {
                    $crate::topology::incidence::adjacent_through::<T, $c, $through, F>(self, c, f)
                }
            }
        )*
    };
}

pub(crate) use {impl_adjacent, impl_incident};
