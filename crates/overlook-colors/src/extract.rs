//! Average block colours out of game and mod archives.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use zip::ZipArchive;

use crate::ColorMap;
use crate::color::Rgba;
use crate::palette::VEGETATION;

const GAME_TEXTURES: &str = "assets/minecraft/textures/block/";
const GAME_BLOCKSTATES: &str = "assets/minecraft/blockstates/";
const FABRIC_MANIFEST: &str = "fabric.mod.json";
const FORGE_MANIFEST: &str = "META-INF/mods.toml";
/// Pixels at or below this alpha are ignored when averaging.
const ALPHA_CUTOFF: u8 = 128;

#[derive(Debug)]
pub enum ExtractError {
    Io { path: PathBuf, source: io::Error },
    Archive { path: PathBuf, reason: String },
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::Io { path, source } => {
                write!(f, "cannot read {}: {}", path.display(), source)
            }
            ExtractError::Archive { path, reason } => {
                write!(f, "bad archive {}: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtractError::Io { source, .. } => Some(source),
            ExtractError::Archive { .. } => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    /// The game client jar.
    Game,
    /// A mod jar with its own namespace.
    Mod,
}

/// Something that turns an archive into colours. The cache wraps one.
pub trait Extractor: Send + Sync {
    fn extract(&self, kind: ArchiveKind, path: &Path) -> Result<ColorMap, ExtractError>;
}

/// Reads real zip archives.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZipExtractor;

impl Extractor for ZipExtractor {
    fn extract(&self, kind: ArchiveKind, path: &Path) -> Result<ColorMap, ExtractError> {
        match kind {
            ArchiveKind::Game => extract_game_archive(path),
            ArchiveKind::Mod => extract_mod_archive(path),
        }
    }
}

fn open_archive(path: &Path) -> Result<ZipArchive<File>, ExtractError> {
    let file = File::open(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ZipArchive::new(file).map_err(|e| ExtractError::Archive {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Mean colour of pixels with alpha above the cutoff, truncated, alpha 255.
pub fn average_color(img: &image::RgbaImage) -> Option<Rgba> {
    let mut sum = [0u64; 3];
    let mut count = 0u64;
    for p in img.pixels() {
        if p.0[3] > ALPHA_CUTOFF {
            sum[0] += u64::from(p.0[0]);
            sum[1] += u64::from(p.0[1]);
            sum[2] += u64::from(p.0[2]);
            count += 1;
        }
    }
    if count == 0 {
        return None;
    }
    Some(Rgba::rgb(
        (sum[0] / count) as u8,
        (sum[1] / count) as u8,
        (sum[2] / count) as u8,
    ))
}

fn entry_color<R: Read + Seek>(zip: &mut ZipArchive<R>, name: &str) -> Result<Option<Rgba>, String> {
    let mut entry = zip.by_name(name).map_err(|e| e.to_string())?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes).map_err(|e| e.to_string())?;
    let img = image::load_from_memory(&bytes).map_err(|e| e.to_string())?;
    Ok(average_color(&img.to_rgba8()))
}

fn stem(name: &str, ext: &str) -> Option<String> {
    let file = name.rsplit('/').next()?;
    let stem = file.strip_suffix(ext)?;
    (!stem.is_empty()).then(|| stem.to_string())
}

/// Game jar: one colour per `assets/minecraft/textures/block/*.png`, then
/// blockstates without a texture borrow a related id's colour, then the
/// vegetation overrides.
pub fn extract_game_archive(path: &Path) -> Result<ColorMap, ExtractError> {
    let mut zip = open_archive(path)?;
    let names: Vec<String> = zip.file_names().map(str::to_string).collect();
    let mut colors = ColorMap::new();

    for name in names
        .iter()
        .filter(|n| n.starts_with(GAME_TEXTURES) && n.ends_with(".png"))
    {
        let Some(id) = stem(name, ".png") else {
            continue;
        };
        match entry_color(&mut zip, name) {
            Ok(Some(c)) => {
                colors.insert(id, c);
            }
            Ok(None) => {}
            Err(e) => log::debug!("skipping texture {}: {}", name, e),
        }
    }
    let textures = colors.len();

    let states: Vec<String> = names
        .iter()
        .filter(|n| n.starts_with(GAME_BLOCKSTATES) && n.ends_with(".json"))
        .filter_map(|n| stem(n, ".json"))
        .filter(|id| !colors.contains_key(id))
        .collect();
    for id in states {
        let related = colors
            .iter()
            .find(|(k, _)| id.contains(k.as_str()) || k.contains(id.as_str()))
            .map(|(_, c)| *c);
        if let Some(c) = related {
            colors.insert(id, c);
        }
    }

    apply_vegetation_overrides(&mut colors);
    log::info!(
        "extracted {} colours from {} ({} textures)",
        colors.len(),
        path.display(),
        textures
    );
    Ok(colors)
}

/// Force the vegetation greens for bare and `minecraft:`-prefixed ids.
pub fn apply_vegetation_overrides(colors: &mut ColorMap) {
    for (id, c) in VEGETATION {
        colors.insert(id.to_string(), *c);
        colors.insert(format!("minecraft:{}", id), *c);
    }
}

#[derive(Deserialize)]
struct FabricManifest {
    id: Option<String>,
}

#[derive(Deserialize)]
struct ForgeManifest {
    #[serde(default)]
    mods: Vec<ForgeModEntry>,
}

#[derive(Deserialize)]
struct ForgeModEntry {
    #[serde(rename = "modId")]
    mod_id: Option<String>,
}

fn read_entry<R: Read + Seek>(zip: &mut ZipArchive<R>, name: &str) -> Option<String> {
    let mut entry = zip.by_name(name).ok()?;
    let mut s = String::new();
    entry.read_to_string(&mut s).ok()?;
    Some(s)
}

fn forge_mod_id(text: &str) -> Option<String> {
    if let Ok(m) = toml::from_str::<ForgeManifest>(text) {
        if let Some(id) = m.mods.into_iter().find_map(|e| e.mod_id) {
            return Some(id);
        }
    }
    // Some manifests do not parse as strict TOML; fall back to the first modId line.
    text.lines()
        .map(str::trim)
        .filter(|l| l.starts_with("modId"))
        .find_map(|l| l.split_once('='))
        .map(|(_, v)| {
            let v = v.split('#').next().unwrap_or(v);
            v.trim().trim_matches(|c| c == '"' || c == '\'').to_string()
        })
        .filter(|s| !s.is_empty())
}

/// Mod namespace from `fabric.mod.json`, then `META-INF/mods.toml`, then the file name.
pub fn mod_namespace<R: Read + Seek>(zip: &mut ZipArchive<R>, path: &Path) -> String {
    let from_manifest = if let Some(text) = read_entry(zip, FABRIC_MANIFEST) {
        serde_json::from_str::<FabricManifest>(&text)
            .ok()
            .and_then(|m| m.id)
    } else {
        read_entry(zip, FORGE_MANIFEST).and_then(|text| forge_mod_id(&text))
    };
    match from_manifest.filter(|s| !s.is_empty()) {
        Some(id) => id,
        None => path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.split('.').next())
            .unwrap_or("")
            .to_lowercase(),
    }
}

fn mod_texture(name: &str) -> Option<(&str, &str)> {
    let rest = name.strip_prefix("assets/")?;
    let (ns, rest) = rest.split_once('/')?;
    let file = rest
        .strip_prefix("textures/block/")
        .or_else(|| rest.strip_prefix("textures/blocks/"))?;
    if file.contains('/') {
        return None;
    }
    let block = file.strip_suffix(".png")?;
    (!ns.is_empty() && !block.is_empty()).then_some((ns, block))
}

/// Mod jar: textures under `assets/<ns>/textures/block(s)/`, stored as both
/// `ns:name` and `name`.
pub fn extract_mod_archive(path: &Path) -> Result<ColorMap, ExtractError> {
    let mut zip = open_archive(path)?;
    let namespace = mod_namespace(&mut zip, path);
    let names: Vec<String> = zip.file_names().map(str::to_string).collect();
    let mut colors = ColorMap::new();
    let mut textures = 0usize;
    for name in &names {
        let Some((ns, block)) = mod_texture(name) else {
            continue;
        };
        textures += 1;
        match entry_color(&mut zip, name) {
            Ok(Some(c)) => {
                colors.insert(format!("{}:{}", ns, block), c);
                colors.insert(block.to_string(), c);
            }
            Ok(None) => {}
            Err(e) => log::debug!("skipping mod texture {}: {}", name, e),
        }
    }
    log::info!(
        "mod {}: {} block textures, {} colours",
        namespace,
        textures,
        colors.len()
    );
    Ok(colors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_ignores_transparent_pixels() {
        let mut img = image::RgbaImage::new(2, 2);
        img.put_pixel(0, 0, image::Rgba([10, 20, 30, 255]));
        img.put_pixel(1, 0, image::Rgba([21, 41, 61, 200]));
        img.put_pixel(0, 1, image::Rgba([255, 255, 255, 128]));
        img.put_pixel(1, 1, image::Rgba([255, 255, 255, 0]));
        assert_eq!(average_color(&img), Some(Rgba::rgb(15, 30, 45)));
    }

    #[test]
    fn fully_transparent_texture_has_no_color() {
        let img = image::RgbaImage::new(4, 4);
        assert_eq!(average_color(&img), None);
    }

    #[test]
    fn mod_texture_paths() {
        assert_eq!(
            mod_texture("assets/create/textures/block/cogwheel.png"),
            Some(("create", "cogwheel"))
        );
        assert_eq!(
            mod_texture("assets/old/textures/blocks/ore.png"),
            Some(("old", "ore"))
        );
        assert_eq!(mod_texture("assets/create/textures/item/wrench.png"), None);
        assert_eq!(mod_texture("assets/create/textures/block/sub/x.png"), None);
    }

    #[test]
    fn forge_manifest_forms() {
        let strict = "modLoader=\"javafml\"\n[[mods]]\nmodId=\"create\"\n";
        assert_eq!(forge_mod_id(strict).as_deref(), Some("create"));
        let loose = "[[mods]]\nmodId = 'farmersdelight' # id\nversion=${file.jarVersion\n";
        assert_eq!(forge_mod_id(loose).as_deref(), Some("farmersdelight"));
    }

    #[test]
    fn vegetation_overrides_both_forms() {
        let mut colors = ColorMap::new();
        colors.insert("grass_block".into(), Rgba::rgb(1, 1, 1));
        apply_vegetation_overrides(&mut colors);
        assert_eq!(colors["grass_block"], Rgba::rgb(67, 170, 55));
        assert_eq!(colors["minecraft:oak_leaves"], Rgba::rgb(55, 154, 55));
    }
}
