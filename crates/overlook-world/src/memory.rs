//! In-memory region sources, used by tests and benches.

use std::collections::BTreeMap;

use overlook_blocks::{BlockId, CHUNK_WIDTH};

use crate::{
    BlockProbe, ChunkLoadError, ChunkPos, ChunkVoxels, ProbeError, REGION_CHUNKS, RegionError,
    RegionSource,
};

#[derive(Clone, Debug)]
struct Span {
    lo: i32,
    hi: i32,
    id: BlockId,
}

/// Chunk built from vertical spans per column.
///
/// Later spans win where they overlap earlier ones. A failing band makes
/// every probe inside it return an error.
#[derive(Clone, Debug)]
pub struct MemoryChunk {
    columns: Vec<Vec<Span>>,
    failing: Option<(i32, i32)>,
    sections: bool,
}

impl Default for MemoryChunk {
    fn default() -> Self {
        Self::empty()
    }
}

impl MemoryChunk {
    /// A chunk with no sections at all.
    pub fn empty() -> Self {
        Self {
            columns: vec![Vec::new(); CHUNK_WIDTH * CHUNK_WIDTH],
            failing: None,
            sections: false,
        }
    }

    /// A chunk whose sections exist but hold only air.
    pub fn hollow() -> Self {
        Self {
            sections: true,
            ..Self::empty()
        }
    }

    /// Every column filled with `id` from `lo` to `hi` inclusive.
    pub fn filled(lo: i32, hi: i32, id: &str) -> Self {
        Self::empty().fill(lo, hi, id)
    }

    pub fn fill(mut self, lo: i32, hi: i32, id: &str) -> Self {
        for z in 0..CHUNK_WIDTH {
            for x in 0..CHUNK_WIDTH {
                self = self.fill_column(x, z, lo, hi, id);
            }
        }
        self
    }

    pub fn fill_column(mut self, x: usize, z: usize, lo: i32, hi: i32, id: &str) -> Self {
        if x < CHUNK_WIDTH && z < CHUNK_WIDTH {
            self.columns[z * CHUNK_WIDTH + x].push(Span {
                lo,
                hi,
                id: BlockId::new(id),
            });
            self.sections = true;
        }
        self
    }

    pub fn failing_band(mut self, lo: i32, hi: i32) -> Self {
        self.failing = Some((lo, hi));
        self.sections = true;
        self
    }
}

impl ChunkVoxels for MemoryChunk {
    fn has_sections(&self) -> bool {
        self.sections
    }

    fn block(&self, x: usize, y: i32, z: usize) -> Result<BlockProbe, ProbeError> {
        if x >= CHUNK_WIDTH || z >= CHUNK_WIDTH {
            return Err(ProbeError::OutOfBounds { x, y, z });
        }
        if let Some((lo, hi)) = self.failing {
            if y >= lo && y <= hi {
                return Err(ProbeError::Corrupt(format!("unreadable at y={}", y)));
            }
        }
        let hit = self.columns[z * CHUNK_WIDTH + x]
            .iter()
            .rev()
            .find(|s| y >= s.lo && y <= s.hi);
        Ok(match hit {
            Some(span) => BlockProbe::Block(span.id.clone()),
            None if self.sections => BlockProbe::Block(BlockId::air()),
            None => BlockProbe::Absent,
        })
    }
}

/// How a [`MemoryRegion`] answers enumeration queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Listing {
    /// Bulk listing and existence probes both work.
    #[default]
    Full,
    /// Bulk listing unsupported, probes work.
    ProbeOnly,
    /// Neither is supported.
    Opaque,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryRegion {
    chunks: BTreeMap<ChunkPos, Result<MemoryChunk, String>>,
    listing: Listing,
}

impl MemoryRegion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every chunk of a `chunks_per_side`² region set to `chunk`.
    pub fn uniform(chunks_per_side: usize, chunk: MemoryChunk) -> Self {
        let mut region = Self::new();
        for cz in 0..chunks_per_side.min(REGION_CHUNKS) {
            for cx in 0..chunks_per_side.min(REGION_CHUNKS) {
                region.insert(ChunkPos::new(cx, cz), chunk.clone());
            }
        }
        region
    }

    pub fn insert(&mut self, pos: ChunkPos, chunk: MemoryChunk) -> &mut Self {
        self.chunks.insert(pos, Ok(chunk));
        self
    }

    /// A present chunk whose decode always fails.
    pub fn insert_corrupt(&mut self, pos: ChunkPos, reason: &str) -> &mut Self {
        self.chunks.insert(pos, Err(reason.to_string()));
        self
    }

    pub fn with_listing(mut self, listing: Listing) -> Self {
        self.listing = listing;
        self
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl RegionSource for MemoryRegion {
    fn list_chunks(&self) -> Result<Vec<ChunkPos>, RegionError> {
        match self.listing {
            Listing::Full => Ok(self.chunks.keys().copied().collect()),
            _ => Err(RegionError::Unsupported),
        }
    }

    fn chunk_exists(&self, pos: ChunkPos) -> Result<bool, RegionError> {
        match self.listing {
            Listing::Opaque => Err(RegionError::Unsupported),
            _ => Ok(self.chunks.contains_key(&pos)),
        }
    }

    fn load_chunk(&self, pos: ChunkPos) -> Result<Box<dyn ChunkVoxels + Send>, ChunkLoadError> {
        match self.chunks.get(&pos) {
            Some(Ok(chunk)) => Ok(Box::new(chunk.clone())),
            Some(Err(reason)) => Err(ChunkLoadError::Decode {
                pos,
                reason: reason.clone(),
            }),
            None => Err(ChunkLoadError::Missing(pos)),
        }
    }
}
