//! Block identifiers and the region-wide block grid.
#![forbid(unsafe_code)]

pub mod grid;
pub mod id;

pub use grid::{BlockGrid, CHUNK_WIDTH};
pub use id::{AIR_IDS, BlockId, DEFAULT_NAMESPACE, NONE_ID, normalize};
