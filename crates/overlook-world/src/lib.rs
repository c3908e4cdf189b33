//! Region sources: where chunk voxels come from.
#![forbid(unsafe_code)]

pub mod anvil;
pub mod memory;

use std::fmt;
use std::path::PathBuf;

use overlook_blocks::BlockId;

pub use anvil::{AnvilChunk, AnvilRegion};
pub use memory::{Listing, MemoryChunk, MemoryRegion};

/// Largest supported region side, in chunks.
pub const REGION_CHUNKS: usize = 32;

/// Chunk coordinate local to a region: `0 <= cx, cz < REGION_CHUNKS`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    pub cx: usize,
    pub cz: usize,
}

impl ChunkPos {
    #[inline]
    pub const fn new(cx: usize, cz: usize) -> Self {
        Self { cx, cz }
    }

    #[inline]
    pub fn within(&self, chunks_per_side: usize) -> bool {
        self.cx < chunks_per_side && self.cz < chunks_per_side
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.cx, self.cz)
    }
}

/// Inclusive world-height domain searched per column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerticalRange {
    pub min_y: i32,
    pub max_y: i32,
}

impl VerticalRange {
    pub const fn new(min_y: i32, max_y: i32) -> Self {
        Self { min_y, max_y }
    }

    #[inline]
    pub fn contains(&self, y: i32) -> bool {
        y >= self.min_y && y <= self.max_y
    }
}

impl Default for VerticalRange {
    fn default() -> Self {
        Self::new(-64, 319)
    }
}

/// Outcome of a single voxel lookup that did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockProbe {
    Block(BlockId),
    /// No section / no data at this height.
    Absent,
}

impl BlockProbe {
    /// The id when the probe found something other than air.
    pub fn filled(self) -> Option<BlockId> {
        match self {
            BlockProbe::Block(id) if id.is_filled() => Some(id),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeError {
    OutOfBounds { x: usize, y: i32, z: usize },
    Corrupt(String),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::OutOfBounds { x, y, z } => {
                write!(f, "column ({}, {}) at y={} is outside the chunk", x, z, y)
            }
            ProbeError::Corrupt(msg) => write!(f, "corrupt section data: {}", msg),
        }
    }
}

impl std::error::Error for ProbeError {}

/// Read-only voxel access for one decoded chunk.
pub trait ChunkVoxels {
    /// Whether any vertical section carries block data.
    fn has_sections(&self) -> bool;

    /// Look up the block at local column (`x`, `z`) and world height `y`.
    fn block(&self, x: usize, y: i32, z: usize) -> Result<BlockProbe, ProbeError>;
}

#[derive(Debug)]
pub enum RegionError {
    NotFound(PathBuf),
    NotRegionFile(PathBuf),
    Io(std::io::Error),
    Container(String),
    Unsupported,
}

impl fmt::Display for RegionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionError::NotFound(p) => write!(f, "region file does not exist: {}", p.display()),
            RegionError::NotRegionFile(p) => write!(f, "not a region file: {}", p.display()),
            RegionError::Io(e) => write!(f, "region io error: {}", e),
            RegionError::Container(msg) => write!(f, "invalid region container: {}", msg),
            RegionError::Unsupported => write!(f, "operation not supported by this region source"),
        }
    }
}

impl std::error::Error for RegionError {}

impl From<std::io::Error> for RegionError {
    fn from(e: std::io::Error) -> Self {
        RegionError::Io(e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkLoadError {
    Missing(ChunkPos),
    Decode { pos: ChunkPos, reason: String },
}

impl fmt::Display for ChunkLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkLoadError::Missing(pos) => write!(f, "chunk {} is not present", pos),
            ChunkLoadError::Decode { pos, reason } => {
                write!(f, "chunk {} failed to decode: {}", pos, reason)
            }
        }
    }
}

impl std::error::Error for ChunkLoadError {}

/// A region container shared read-only between scan workers.
///
/// Implementations must be safe to call from several threads at once.
/// Enumeration is optional: sources that cannot list or probe chunks keep
/// the default `Unsupported` answers and the scheduler falls back.
pub trait RegionSource: Send + Sync {
    /// Populated chunk coordinates in one pass.
    fn list_chunks(&self) -> Result<Vec<ChunkPos>, RegionError> {
        Err(RegionError::Unsupported)
    }

    fn chunk_exists(&self, _pos: ChunkPos) -> Result<bool, RegionError> {
        Err(RegionError::Unsupported)
    }

    fn load_chunk(&self, pos: ChunkPos) -> Result<Box<dyn ChunkVoxels + Send>, ChunkLoadError>;
}
