use std::collections::BTreeMap;

use crate::id::BlockId;

/// Columns per chunk side.
pub const CHUNK_WIDTH: usize = 16;

/// Dense top-surface grid, row-major by world Z then world X.
///
/// Cells start as `none`; chunk results are pasted into disjoint
/// `CHUNK_WIDTH`-sized squares.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockGrid {
    width: usize,
    height: usize,
    cells: Vec<BlockId>,
}

impl BlockGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![BlockId::none(); width * height],
        }
    }

    /// Square grid covering `chunks_per_side`² chunks.
    pub fn for_region(chunks_per_side: usize) -> Self {
        let side = chunks_per_side * CHUNK_WIDTH;
        Self::new(side, side)
    }

    pub fn from_rows(rows: Vec<Vec<BlockId>>) -> Option<Self> {
        let height = rows.len();
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != width) {
            return None;
        }
        let cells = rows.into_iter().flatten().collect();
        Some(Self {
            width,
            height,
            cells,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn idx(&self, x: usize, z: usize) -> usize {
        z * self.width + x
    }

    #[inline]
    pub fn get(&self, x: usize, z: usize) -> Option<&BlockId> {
        if x >= self.width || z >= self.height {
            return None;
        }
        self.cells.get(self.idx(x, z))
    }

    pub fn set(&mut self, x: usize, z: usize, id: BlockId) {
        if x < self.width && z < self.height {
            let i = self.idx(x, z);
            self.cells[i] = id;
        }
    }

    #[inline]
    pub fn row(&self, z: usize) -> &[BlockId] {
        let start = z * self.width;
        &self.cells[start..start + self.width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[BlockId]> {
        self.cells.chunks(self.width.max(1)).take(self.height)
    }

    pub fn cells(&self) -> &[BlockId] {
        &self.cells
    }

    /// Copy a `size`×`size` square (row-major by z) with its corner at
    /// (`x0`, `z0`). Parts falling outside the grid are dropped.
    pub fn paste_square(&mut self, x0: usize, z0: usize, size: usize, square: &[BlockId]) {
        for dz in 0..size {
            let z = z0 + dz;
            if z >= self.height {
                break;
            }
            for dx in 0..size {
                let x = x0 + dx;
                if x >= self.width {
                    break;
                }
                if let Some(id) = square.get(dz * size + dx) {
                    let i = self.idx(x, z);
                    self.cells[i] = id.clone();
                }
            }
        }
    }

    /// Cell counts per distinct id, sorted by id.
    pub fn histogram(&self) -> BTreeMap<BlockId, usize> {
        let mut counts = BTreeMap::new();
        for id in &self.cells {
            *counts.entry(id.clone()).or_insert(0) += 1;
        }
        counts
    }
}
