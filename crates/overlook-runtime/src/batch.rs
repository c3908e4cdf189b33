use std::collections::BTreeSet;
use std::panic::{AssertUnwindSafe, catch_unwind};

use overlook_blocks::BlockId;
use overlook_chunk::{ChunkColumns, SampleInterval, resolve_columns};
use overlook_world::{ChunkPos, RegionSource, VerticalRange};

use crate::CancelToken;

/// How the populated chunk list was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Enumeration {
    Listed,
    Probed,
    Assumed,
}

/// Populated chunks inside the `n`×`n` bounds, ordered by (cz, cx).
///
/// Tries the bulk listing, then per-coordinate probes, and finally assumes
/// every coordinate is populated.
pub fn enumerate_chunks(source: &dyn RegionSource, n: usize) -> (Vec<ChunkPos>, Enumeration) {
    match source.list_chunks() {
        Ok(mut list) => {
            list.retain(|p| p.within(n));
            list.sort_by_key(|p| (p.cz, p.cx));
            list.dedup();
            return (list, Enumeration::Listed);
        }
        Err(e) => log::debug!("chunk listing unavailable ({}), probing", e),
    }

    let mut probed = Vec::new();
    let mut probe_failed = false;
    'outer: for cz in 0..n {
        for cx in 0..n {
            let pos = ChunkPos::new(cx, cz);
            match source.chunk_exists(pos) {
                Ok(true) => probed.push(pos),
                Ok(false) => {}
                Err(e) => {
                    log::debug!("chunk probe unavailable ({}), assuming all present", e);
                    probe_failed = true;
                    break 'outer;
                }
            }
        }
    }
    if !probe_failed {
        return (probed, Enumeration::Probed);
    }

    let all = (0..n)
        .flat_map(|cz| (0..n).map(move |cx| ChunkPos::new(cx, cz)))
        .collect();
    (all, Enumeration::Assumed)
}

/// Split into contiguous batches of `ceil(len / workers)` coordinates.
pub fn partition(coords: &[ChunkPos], workers: usize) -> Vec<Vec<ChunkPos>> {
    if coords.is_empty() {
        return Vec::new();
    }
    let size = coords.len().div_ceil(workers.max(1));
    coords.chunks(size).map(|c| c.to_vec()).collect()
}

/// Owned output of one batch, merged by the orchestrator.
#[derive(Clone, Debug)]
pub struct BatchResult {
    pub index: usize,
    pub patches: Vec<(ChunkPos, Vec<BlockId>)>,
    pub discovered: BTreeSet<BlockId>,
    pub processed: usize,
    pub failed: usize,
    /// Cancelled before it started; nothing was resolved.
    pub skipped: bool,
}

impl BatchResult {
    fn empty(index: usize) -> Self {
        Self {
            index,
            patches: Vec::new(),
            discovered: BTreeSet::new(),
            processed: 0,
            failed: 0,
            skipped: false,
        }
    }
}

fn resolve_chunk(
    source: &dyn RegionSource,
    pos: ChunkPos,
    interval: SampleInterval,
    range: VerticalRange,
) -> Option<ChunkColumns> {
    let loaded = catch_unwind(AssertUnwindSafe(|| {
        source
            .load_chunk(pos)
            .map(|chunk| {
                if !chunk.has_sections() {
                    log::debug!("chunk {} has no block sections", pos);
                }
                resolve_columns(&*chunk, interval, range)
            })
    }));
    match loaded {
        Ok(Ok(cols)) => Some(cols),
        Ok(Err(e)) => {
            log::debug!("{}", e);
            None
        }
        Err(_) => {
            log::warn!("chunk {} panicked during resolution", pos);
            None
        }
    }
}

/// Resolve every chunk of one batch. Chunk failures become `none` squares.
pub fn run_batch(
    index: usize,
    source: &dyn RegionSource,
    coords: &[ChunkPos],
    interval: SampleInterval,
    range: VerticalRange,
    cancel: &CancelToken,
) -> BatchResult {
    let mut out = BatchResult::empty(index);
    if cancel.is_cancelled() {
        out.skipped = true;
        return out;
    }
    for &pos in coords {
        let cols = match resolve_chunk(source, pos, interval, range) {
            Some(cols) => cols,
            None => {
                out.failed += 1;
                ChunkColumns::failed()
            }
        };
        let (cells, discovered) = cols.into_parts();
        out.discovered.extend(discovered);
        out.patches.push((pos, cells));
        out.processed += 1;
    }
    out
}
