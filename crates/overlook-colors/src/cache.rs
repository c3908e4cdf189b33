//! On-disk colour cache.
//!
//! Per-archive entries are named `<archive-file-name>_<mtime-secs>_colors.json`,
//! so a touched archive simply misses. The aggregate over a mods directory
//! (`all_mods_colors_<hash>.json`) is valid while it is newer than every
//! member archive. Colours are stored as `#rrggbb` / `#rrggbbaa`.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ColorMap;
use crate::color::{Rgba, fnv1a64};
use crate::extract::{ArchiveKind, ExtractError, Extractor};

const ENTRY_SUFFIX: &str = "_colors.json";

#[derive(Debug)]
pub enum CacheError {
    Io { path: PathBuf, source: io::Error },
    Format { path: PathBuf, reason: String },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Io { path, source } => {
                write!(f, "colour cache io error at {}: {}", path.display(), source)
            }
            CacheError::Format { path, reason } => {
                write!(f, "unreadable colour cache {}: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Io { source, .. } => Some(source),
            CacheError::Format { .. } => None,
        }
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn modified(path: &Path) -> Result<SystemTime, CacheError> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(io_err(path))
}

fn mtime_secs(path: &Path) -> Result<u64, CacheError> {
    Ok(modified(path)?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0))
}

fn sanitize(name: &str) -> String {
    name.replace([' ', ':'], "_")
}

/// Serialize colours as a sorted id to hex map.
pub fn encode_colors(colors: &ColorMap) -> String {
    let hex: BTreeMap<&str, String> = colors
        .iter()
        .map(|(k, c)| (k.as_str(), c.to_hex()))
        .collect();
    serde_json::to_string_pretty(&hex).unwrap_or_else(|_| "{}".to_string())
}

/// Parse a hex map; entries that are not 6 or 8 hex digits are dropped.
pub fn decode_colors(text: &str) -> Result<ColorMap, String> {
    let hex: BTreeMap<String, String> = serde_json::from_str(text).map_err(|e| e.to_string())?;
    Ok(hex
        .into_iter()
        .filter_map(|(k, v)| Rgba::from_hex(&v).map(|c| (k, c)))
        .collect())
}

#[derive(Clone, Debug)]
pub struct ColorCache {
    dir: PathBuf,
}

impl ColorCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<tmp>/overlook_color_cache`.
    pub fn default_dir() -> PathBuf {
        std::env::temp_dir().join("overlook_color_cache")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_dir(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).map_err(io_err(&self.dir))
    }

    fn archive_prefix(archive: &Path) -> String {
        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        sanitize(&format!("{}_", name))
    }

    /// Cache file for the archive's current mtime.
    pub fn entry_path(&self, archive: &Path) -> Result<PathBuf, CacheError> {
        let secs = mtime_secs(archive)?;
        Ok(self.dir.join(format!(
            "{}{}{}",
            Self::archive_prefix(archive),
            secs,
            ENTRY_SUFFIX
        )))
    }

    fn read_map(path: &Path) -> Result<ColorMap, CacheError> {
        let text = fs::read_to_string(path).map_err(io_err(path))?;
        decode_colors(&text).map_err(|reason| CacheError::Format {
            path: path.to_path_buf(),
            reason,
        })
    }

    fn write_map(&self, path: &Path, colors: &ColorMap) -> Result<(), CacheError> {
        self.ensure_dir()?;
        fs::write(path, encode_colors(colors)).map_err(io_err(path))
    }

    /// Cached colours for the archive as it is now, if any.
    pub fn load(&self, archive: &Path) -> Result<Option<ColorMap>, CacheError> {
        let path = self.entry_path(archive)?;
        if !path.is_file() {
            return Ok(None);
        }
        Self::read_map(&path).map(Some)
    }

    /// Write the entry for the archive's current mtime and drop entries for older mtimes.
    pub fn store(&self, archive: &Path, colors: &ColorMap) -> Result<PathBuf, CacheError> {
        let path = self.entry_path(archive)?;
        self.write_map(&path, colors)?;
        self.prune_stale(archive, &path);
        Ok(path)
    }

    fn prune_stale(&self, archive: &Path, keep: &Path) {
        let prefix = Self::archive_prefix(archive);
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path == keep {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let stale = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(ENTRY_SUFFIX))
                .is_some_and(|mtime| mtime.parse::<u64>().is_ok());
            if stale {
                if let Err(e) = fs::remove_file(&path) {
                    log::debug!("could not remove stale cache {}: {}", path.display(), e);
                }
            }
        }
    }

    /// Cached colours when fresh, otherwise run `extractor` and cache its result.
    ///
    /// Cache failures only cost a re-extraction; extraction failures are returned.
    pub fn load_or_extract(
        &self,
        kind: ArchiveKind,
        archive: &Path,
        extractor: &dyn Extractor,
    ) -> Result<ColorMap, ExtractError> {
        match self.load(archive) {
            Ok(Some(colors)) => {
                log::debug!(
                    "colour cache hit for {} ({} ids)",
                    archive.display(),
                    colors.len()
                );
                return Ok(colors);
            }
            Ok(None) => log::info!("colour cache miss for {}, extracting", archive.display()),
            Err(e) => log::warn!("{}; extracting again", e),
        }
        let colors = extractor.extract(kind, archive)?;
        if !colors.is_empty() {
            match self.store(archive, &colors) {
                Ok(path) => log::debug!("cached colours at {}", path.display()),
                Err(e) => log::warn!("{}", e),
            }
        }
        Ok(colors)
    }

    pub fn aggregate_path(&self, mods_dir: &Path) -> PathBuf {
        let key = fnv1a64(mods_dir.to_string_lossy().as_bytes());
        self.dir.join(format!("all_mods_colors_{:016x}.json", key))
    }

    /// The aggregate for `mods_dir`, valid only if it is newer than every member.
    pub fn load_aggregate(&self, mods_dir: &Path, members: &[PathBuf]) -> Option<ColorMap> {
        let path = self.aggregate_path(mods_dir);
        if !path.is_file() {
            return None;
        }
        let fresh = || -> Result<bool, CacheError> {
            let cache_time = modified(&path)?;
            for m in members {
                if modified(m)? >= cache_time {
                    return Ok(false);
                }
            }
            Ok(true)
        };
        match fresh() {
            Ok(true) => {}
            Ok(false) => {
                log::info!("mods changed since {}, rebuilding", path.display());
                return None;
            }
            Err(e) => {
                log::warn!("{}", e);
                return None;
            }
        }
        match Self::read_map(&path) {
            Ok(colors) => Some(colors),
            Err(e) => {
                log::warn!("{}", e);
                None
            }
        }
    }

    pub fn store_aggregate(&self, mods_dir: &Path, colors: &ColorMap) -> Result<PathBuf, CacheError> {
        let path = self.aggregate_path(mods_dir);
        self.write_map(&path, colors)?;
        Ok(path)
    }

    /// Delete every `.json` file in the cache directory; returns how many went.
    pub fn clear(&self) -> Result<usize, CacheError> {
        if !self.dir.is_dir() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir).map_err(io_err(&self.dir))? {
            let path = entry.map_err(io_err(&self.dir))?.path();
            if path.extension().is_some_and(|e| e == "json") {
                match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => log::warn!("cannot remove {}: {}", path.display(), e),
                }
            }
        }
        log::info!("cleared {} colour cache files", removed);
        Ok(removed)
    }
}
