//! Attribute storage: chunked arrays, the type registry, and the
//! refcounted attribute container.
#![warn(missing_docs)]

pub mod chunk_array;
pub mod container;
pub mod registry;
pub mod value;

pub use chunk_array::{AttributeArray, ChunkArray};
pub use container::{AttributeContainer, AttributeId, INVALID_INDEX};
pub use value::AttributeValue;
