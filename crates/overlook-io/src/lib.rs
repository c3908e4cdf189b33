//! Block grid text encoding: a JSON array of rows, written one row per line.
#![forbid(unsafe_code)]

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use overlook_blocks::{BlockGrid, BlockId};

/// Stream `grid` row by row; ids are JSON-escaped.
pub fn write_grid<W: Write>(grid: &BlockGrid, mut out: W) -> io::Result<()> {
    out.write_all(b"[\n")?;
    let last = grid.height().saturating_sub(1);
    for (z, row) in grid.rows().enumerate() {
        out.write_all(b"  [")?;
        for (x, id) in row.iter().enumerate() {
            if x > 0 {
                out.write_all(b", ")?;
            }
            serde_json::to_writer(&mut out, id.as_str()).map_err(io::Error::from)?;
        }
        out.write_all(if z < last { b"],\n" } else { b"]\n" })?;
    }
    out.write_all(b"]\n")?;
    out.flush()
}

pub fn save_grid(grid: &BlockGrid, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_grid(grid, BufWriter::new(file))?;
    log::info!(
        "saved {}x{} block grid to {}",
        grid.width(),
        grid.height(),
        path.display()
    );
    Ok(())
}

#[derive(Debug)]
pub enum GridReadError {
    Io { path: Option<PathBuf>, source: io::Error },
    Parse(serde_json::Error),
    /// Rows of differing lengths.
    Ragged,
}

impl fmt::Display for GridReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridReadError::Io {
                path: Some(p),
                source,
            } => write!(f, "cannot read grid {}: {}", p.display(), source),
            GridReadError::Io { path: None, source } => write!(f, "cannot read grid: {}", source),
            GridReadError::Parse(e) => write!(f, "malformed grid: {}", e),
            GridReadError::Ragged => write!(f, "grid rows have different lengths"),
        }
    }
}

impl std::error::Error for GridReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GridReadError::Io { source, .. } => Some(source),
            GridReadError::Parse(e) => Some(e),
            GridReadError::Ragged => None,
        }
    }
}

pub fn read_grid<R: Read>(input: R) -> Result<BlockGrid, GridReadError> {
    let rows: Vec<Vec<String>> = serde_json::from_reader(input).map_err(|e| {
        if e.is_io() {
            GridReadError::Io {
                path: None,
                source: e.into(),
            }
        } else {
            GridReadError::Parse(e)
        }
    })?;
    let rows = rows
        .into_iter()
        .map(|r| r.into_iter().map(BlockId::from).collect())
        .collect();
    BlockGrid::from_rows(rows).ok_or(GridReadError::Ragged)
}

pub fn load_grid(path: &Path) -> Result<BlockGrid, GridReadError> {
    let file = File::open(path).map_err(|source| GridReadError::Io {
        path: Some(path.to_path_buf()),
        source,
    })?;
    read_grid(BufReader::new(file))
}
