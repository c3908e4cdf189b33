//! Anvil (`r.<x>.<z>.mca`) region files.
//!
//! The location table at the start of the file is read directly for chunk
//! enumeration; sector reads and decompression go through `fastanvil`, and
//! the chunk NBT is deserialized with `fastnbt`.
//!
//! Block indices inside a section are ordered (Y, Z, X). Since data version
//! 2529 packed palette indices never straddle a 64-bit word; older chunks
//! pack them end to end. Chunks written before 1.18 keep their sections
//! under `Level.Sections` with capitalized tag names.

use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fastanvil::Region;
use fastnbt::{ByteArray, LongArray};
use overlook_blocks::{BlockId, CHUNK_WIDTH};
use serde::Deserialize;

use crate::{
    BlockProbe, ChunkLoadError, ChunkPos, ChunkVoxels, ProbeError, REGION_CHUNKS, RegionError,
    RegionSource,
};

const SECTOR_SIZE: usize = 4096;
const HEADER_SIZE: usize = 2 * SECTOR_SIZE;
const SECTION_HEIGHT: i32 = 16;
const SECTION_VOLUME: usize = CHUNK_WIDTH * CHUNK_WIDTH * SECTION_HEIGHT as usize;
const MIN_BITS_PER_ENTRY: u32 = 4;
const ALIGNED_PACKING_SINCE: i32 = 2529;

/// A region file held in memory and shared by all workers.
///
/// Every chunk read builds its own cursor over the shared bytes, so
/// concurrent `load_chunk` calls never contend.
pub struct AnvilRegion {
    path: PathBuf,
    coords: Option<(i32, i32)>,
    bytes: Arc<[u8]>,
}

impl AnvilRegion {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RegionError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(RegionError::NotFound(path.to_path_buf()));
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if !name.starts_with("r.") {
            return Err(RegionError::NotRegionFile(path.to_path_buf()));
        }
        let bytes: Arc<[u8]> = fs::read(path)?.into();
        Self::from_bytes(path, bytes)
    }

    pub fn from_bytes(path: impl AsRef<Path>, bytes: Arc<[u8]>) -> Result<Self, RegionError> {
        let path = path.as_ref().to_path_buf();
        if bytes.len() < HEADER_SIZE {
            return Err(RegionError::Container(format!(
                "header truncated: {} bytes, need {}",
                bytes.len(),
                HEADER_SIZE
            )));
        }
        Region::from_stream(Cursor::new(Arc::clone(&bytes)))
            .map_err(|e| RegionError::Container(e.to_string()))?;
        let coords = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(parse_region_coords);
        Ok(Self {
            path,
            coords,
            bytes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Region coordinates parsed from the file name, if it follows `r.<x>.<z>.mca`.
    pub fn coords(&self) -> Option<(i32, i32)> {
        self.coords
    }

    fn location_entry(&self, pos: ChunkPos) -> u32 {
        let i = 4 * (pos.cz * REGION_CHUNKS + pos.cx);
        u32::from_be_bytes([
            self.bytes[i],
            self.bytes[i + 1],
            self.bytes[i + 2],
            self.bytes[i + 3],
        ])
    }
}

fn parse_region_coords(name: &str) -> Option<(i32, i32)> {
    let mut parts = name.split('.');
    if parts.next()? != "r" {
        return None;
    }
    let x = parts.next()?.parse().ok()?;
    let z = parts.next()?.parse().ok()?;
    Some((x, z))
}

impl RegionSource for AnvilRegion {
    fn list_chunks(&self) -> Result<Vec<ChunkPos>, RegionError> {
        let mut out = Vec::new();
        for cz in 0..REGION_CHUNKS {
            for cx in 0..REGION_CHUNKS {
                let pos = ChunkPos::new(cx, cz);
                if self.chunk_exists(pos)? {
                    out.push(pos);
                }
            }
        }
        Ok(out)
    }

    fn chunk_exists(&self, pos: ChunkPos) -> Result<bool, RegionError> {
        if !pos.within(REGION_CHUNKS) {
            return Ok(false);
        }
        let entry = self.location_entry(pos);
        let offset = entry >> 8;
        let sectors = entry & 0xFF;
        Ok(offset >= 2 && sectors > 0)
    }

    fn load_chunk(&self, pos: ChunkPos) -> Result<Box<dyn ChunkVoxels + Send>, ChunkLoadError> {
        if !pos.within(REGION_CHUNKS) {
            return Err(ChunkLoadError::Missing(pos));
        }
        let decode_err = |reason: String| ChunkLoadError::Decode { pos, reason };
        let mut region = Region::from_stream(Cursor::new(Arc::clone(&self.bytes)))
            .map_err(|e| decode_err(e.to_string()))?;
        let data = region
            .read_chunk(pos.cx, pos.cz)
            .map_err(|e| decode_err(e.to_string()))?
            .ok_or(ChunkLoadError::Missing(pos))?;
        let chunk = AnvilChunk::from_nbt(&data).map_err(decode_err)?;
        Ok(Box::new(chunk))
    }
}

#[derive(Deserialize)]
struct ChunkNbt {
    #[serde(rename = "DataVersion", default)]
    data_version: i32,
    #[serde(default)]
    sections: Vec<SectionNbt>,
    #[serde(rename = "Level", default)]
    level: Option<LevelNbt>,
}

#[derive(Deserialize)]
struct SectionNbt {
    #[serde(rename = "Y")]
    y: i8,
    #[serde(default)]
    block_states: Option<BlockStatesNbt>,
}

#[derive(Deserialize)]
struct BlockStatesNbt {
    palette: Vec<PaletteEntryNbt>,
    #[serde(default)]
    data: Option<LongArray>,
}

#[derive(Deserialize)]
struct LevelNbt {
    #[serde(rename = "Sections", default)]
    sections: Vec<LevelSectionNbt>,
}

#[derive(Deserialize)]
struct LevelSectionNbt {
    #[serde(rename = "Y")]
    y: i8,
    #[serde(rename = "Palette", default)]
    palette: Option<Vec<PaletteEntryNbt>>,
    #[serde(rename = "BlockStates", default)]
    block_states: Option<LongArray>,
    // Numeric ids from before the flattening.
    #[serde(rename = "Blocks", default)]
    blocks: Option<ByteArray>,
}

#[derive(Deserialize)]
struct PaletteEntryNbt {
    #[serde(rename = "Name")]
    name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Packing {
    Aligned,
    Compact,
}

impl Packing {
    fn for_version(data_version: i32) -> Self {
        if data_version >= ALIGNED_PACKING_SINCE {
            Packing::Aligned
        } else {
            Packing::Compact
        }
    }
}

#[derive(Clone, Debug)]
struct Section {
    palette: Vec<BlockId>,
    // None when the palette has a single entry.
    indices: Option<Vec<u16>>,
}

impl Section {
    fn block(&self, x: usize, local_y: usize, z: usize) -> Result<BlockProbe, ProbeError> {
        let Some(indices) = self.indices.as_ref() else {
            return Ok(self
                .palette
                .first()
                .cloned()
                .map(BlockProbe::Block)
                .unwrap_or(BlockProbe::Absent));
        };
        let i = (local_y * CHUNK_WIDTH + z) * CHUNK_WIDTH + x;
        let pi = indices[i] as usize;
        self.palette
            .get(pi)
            .cloned()
            .map(BlockProbe::Block)
            .ok_or_else(|| {
                ProbeError::Corrupt(format!(
                    "palette index {} out of {} entries",
                    pi,
                    self.palette.len()
                ))
            })
    }
}

/// One decoded chunk: sections keyed by section Y.
#[derive(Clone, Debug, Default)]
pub struct AnvilChunk {
    sections: BTreeMap<i32, Section>,
}

impl AnvilChunk {
    /// Decode uncompressed chunk NBT, either the sectioned layout or the
    /// older `Level` layout.
    pub fn from_nbt(data: &[u8]) -> Result<Self, String> {
        let nbt: ChunkNbt = fastnbt::from_bytes(data).map_err(|e| format!("nbt: {e}"))?;
        let mut sections = BTreeMap::new();
        for sec in nbt.sections {
            let Some(states) = sec.block_states else {
                continue;
            };
            if let Some(section) =
                decode_section(sec.y, &states.palette, states.data.as_deref(), Packing::Aligned)?
            {
                sections.insert(i32::from(sec.y), section);
            }
        }
        if let Some(level) = nbt.level {
            let packing = Packing::for_version(nbt.data_version);
            let mut numeric = 0;
            for sec in level.sections {
                let Some(palette) = sec.palette else {
                    if sec.blocks.is_some() {
                        numeric += 1;
                    }
                    continue;
                };
                if let Some(section) =
                    decode_section(sec.y, &palette, sec.block_states.as_deref(), packing)?
                {
                    sections.insert(i32::from(sec.y), section);
                }
            }
            if sections.is_empty() && numeric > 0 {
                return Err(format!(
                    "{} sections use numeric block ids (data version {})",
                    numeric, nbt.data_version
                ));
            }
        }
        Ok(Self { sections })
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }
}

impl ChunkVoxels for AnvilChunk {
    fn has_sections(&self) -> bool {
        !self.sections.is_empty()
    }

    fn block(&self, x: usize, y: i32, z: usize) -> Result<BlockProbe, ProbeError> {
        if x >= CHUNK_WIDTH || z >= CHUNK_WIDTH {
            return Err(ProbeError::OutOfBounds { x, y, z });
        }
        let sy = y.div_euclid(SECTION_HEIGHT);
        let ly = y.rem_euclid(SECTION_HEIGHT) as usize;
        match self.sections.get(&sy) {
            Some(section) => section.block(x, ly, z),
            None => Ok(BlockProbe::Absent),
        }
    }
}

fn decode_section(
    y: i8,
    entries: &[PaletteEntryNbt],
    data: Option<&[i64]>,
    packing: Packing,
) -> Result<Option<Section>, String> {
    if entries.is_empty() {
        return Ok(None);
    }
    let palette: Vec<BlockId> = entries.iter().map(|p| BlockId::new(&p.name)).collect();
    let indices = match (data, palette.len()) {
        (_, 1) => None,
        (Some(data), n) => {
            let unpacked = match packing {
                Packing::Aligned => unpack_indices(data, n),
                Packing::Compact => unpack_compact(data, n),
            };
            Some(unpacked.map_err(|e| format!("section y={}: {}", y, e))?)
        }
        (None, n) => {
            return Err(format!(
                "section y={} has {} palette entries but no data",
                y, n
            ));
        }
    };
    Ok(Some(Section { palette, indices }))
}

fn bits_per_entry(palette_len: usize) -> u32 {
    let needed = if palette_len <= 1 {
        0
    } else {
        usize::BITS - (palette_len - 1).leading_zeros()
    };
    needed.max(MIN_BITS_PER_ENTRY)
}

fn unpack_indices(data: &[i64], palette_len: usize) -> Result<Vec<u16>, String> {
    let bits = bits_per_entry(palette_len);
    let per_long = (64 / bits) as usize;
    let needed = SECTION_VOLUME.div_ceil(per_long);
    if data.len() < needed {
        return Err(format!(
            "packed data has {} longs, need {} for {} bits per entry",
            data.len(),
            needed,
            bits
        ));
    }
    let mask = (1u64 << bits) - 1;
    let mut out = Vec::with_capacity(SECTION_VOLUME);
    for i in 0..SECTION_VOLUME {
        let word = data[i / per_long] as u64;
        let shift = (i % per_long) as u32 * bits;
        out.push(((word >> shift) & mask) as u16);
    }
    Ok(out)
}

/// Indices packed end to end, an entry may span two words.
fn unpack_compact(data: &[i64], palette_len: usize) -> Result<Vec<u16>, String> {
    let bits = bits_per_entry(palette_len) as usize;
    let needed = (SECTION_VOLUME * bits).div_ceil(64);
    if data.len() < needed {
        return Err(format!(
            "packed data has {} longs, need {} for {} bits per entry",
            data.len(),
            needed,
            bits
        ));
    }
    let mask = (1u64 << bits) - 1;
    let mut out = Vec::with_capacity(SECTION_VOLUME);
    for i in 0..SECTION_VOLUME {
        let start = i * bits;
        let (word, shift) = (start / 64, start % 64);
        let mut value = (data[word] as u64) >> shift;
        if shift + bits > 64 {
            value |= (data[word + 1] as u64) << (64 - shift);
        }
        out.push((value & mask) as u16);
    }
    Ok(out)
}
