//! Per-chunk top-surface resolution.
#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use overlook_blocks::{BlockId, CHUNK_WIDTH};
use overlook_world::{ChunkVoxels, VerticalRange};

const COLUMNS: usize = CHUNK_WIDTH * CHUNK_WIDTH;

/// Column decimation factor; 1 searches every column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SampleInterval(usize);

impl SampleInterval {
    pub const FULL: SampleInterval = SampleInterval(1);

    /// Values below 1 are raised to 1.
    pub fn new(s: usize) -> Self {
        Self(s.max(1))
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }

    #[inline]
    pub fn is_sampled(self, x: usize, z: usize) -> bool {
        self.0 == 1 || (x % self.0 == 0 && z % self.0 == 0)
    }

    /// The sampled column an unsampled one copies from, clamped to the chunk.
    #[inline]
    pub fn anchor(self, x: usize, z: usize) -> (usize, usize) {
        let s = self.0;
        (
            ((x / s) * s).min(CHUNK_WIDTH - 1),
            ((z / s) * s).min(CHUNK_WIDTH - 1),
        )
    }
}

impl Default for SampleInterval {
    fn default() -> Self {
        Self::FULL
    }
}

/// Resolved 16×16 top blocks of one chunk, row-major by z, plus the set of
/// ids that ended up in it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkColumns {
    cells: Vec<BlockId>,
    discovered: BTreeSet<BlockId>,
}

impl ChunkColumns {
    /// All-`none` result for a chunk that could not be decoded.
    pub fn failed() -> Self {
        let mut discovered = BTreeSet::new();
        discovered.insert(BlockId::none());
        Self {
            cells: vec![BlockId::none(); COLUMNS],
            discovered,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, z: usize) -> &BlockId {
        &self.cells[z * CHUNK_WIDTH + x]
    }

    pub fn cells(&self) -> &[BlockId] {
        &self.cells
    }

    pub fn discovered(&self) -> &BTreeSet<BlockId> {
        &self.discovered
    }

    pub fn into_parts(self) -> (Vec<BlockId>, BTreeSet<BlockId>) {
        (self.cells, self.discovered)
    }
}

/// Topmost filled block of column (`x`, `z`).
///
/// Binary search assuming solid-below/empty-above, then one confirming probe
/// at the final `high`. Probe errors read as empty. Returns `air` when no
/// probe hit anything.
pub fn top_block(chunk: &dyn ChunkVoxels, x: usize, z: usize, range: VerticalRange) -> BlockId {
    let probe = |y: i32| -> Option<BlockId> {
        match chunk.block(x, y, z) {
            Ok(p) => p.filled(),
            Err(_) => None,
        }
    };

    // Bounds in i64 so the full i32 range neither overflows nor wraps.
    let mut low = i64::from(range.min_y);
    let mut high = i64::from(range.max_y);
    let mut candidate: Option<BlockId> = None;
    while low <= high {
        let mid = (low + high).div_euclid(2);
        match i32::try_from(mid).ok().and_then(probe) {
            Some(id) => {
                candidate = Some(id);
                low = mid + 1;
            }
            None => high = mid - 1,
        }
    }

    match candidate {
        Some(found) => i32::try_from(high).ok().and_then(probe).unwrap_or(found),
        None => BlockId::air(),
    }
}

/// Resolve every column of `chunk` at the given sampling interval.
///
/// Sampled columns are searched with [`top_block`]. Other columns copy their
/// anchor column, or become `none` when the anchor holds no value.
pub fn resolve_columns(
    chunk: &dyn ChunkVoxels,
    interval: SampleInterval,
    range: VerticalRange,
) -> ChunkColumns {
    let mut cells: Vec<Option<BlockId>> = vec![None; COLUMNS];
    for z in 0..CHUNK_WIDTH {
        for x in 0..CHUNK_WIDTH {
            if interval.is_sampled(x, z) {
                cells[z * CHUNK_WIDTH + x] = Some(top_block(chunk, x, z, range));
            }
        }
    }

    let mut out = Vec::with_capacity(COLUMNS);
    for z in 0..CHUNK_WIDTH {
        for x in 0..CHUNK_WIDTH {
            let id = match &cells[z * CHUNK_WIDTH + x] {
                Some(id) => id.clone(),
                None => {
                    let (ax, az) = interval.anchor(x, z);
                    cells[az * CHUNK_WIDTH + ax]
                        .clone()
                        .unwrap_or_else(BlockId::none)
                }
            };
            out.push(id);
        }
    }

    let discovered = out.iter().cloned().collect();
    ChunkColumns {
        cells: out,
        discovered,
    }
}
