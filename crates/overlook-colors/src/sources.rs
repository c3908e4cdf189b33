//! Assembling the colour table from built-ins, the game jar and mods.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::ColorMap;
use crate::cache::ColorCache;
use crate::discover::{find_game_archive, find_minecraft_dir, find_mods_dir, list_archives};
use crate::extract::{ArchiveKind, Extractor};
use crate::resolver::ColorResolver;
use crate::table::ColorTable;

fn default_true() -> bool {
    true
}

/// `[colors]` section. Environment switches layer on top through [`ColorOptions::apply_env`].
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ColorOptions {
    /// Extract textures from the game jar.
    #[serde(default = "default_true")]
    pub extract: bool,
    /// Extract textures from mod jars.
    #[serde(default = "default_true")]
    pub mods: bool,
    /// Use the on-disk colour cache.
    #[serde(default = "default_true")]
    pub cache: bool,
    #[serde(default)]
    pub archive: Option<PathBuf>,
    #[serde(default)]
    pub mods_dir: Option<PathBuf>,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Write the merged table as `block_colors_<secs>.json`.
    #[serde(default)]
    pub snapshot: bool,
}

impl Default for ColorOptions {
    fn default() -> Self {
        Self {
            extract: true,
            mods: true,
            cache: true,
            archive: None,
            mods_dir: None,
            cache_dir: None,
            snapshot: false,
        }
    }
}

impl ColorOptions {
    /// Apply the `DISABLE_*` switches (presence turns them on) and path overrides.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if lookup("DISABLE_COLOR_EXTRACTION").is_some() {
            self.extract = false;
        }
        if lookup("DISABLE_MODS_EXTRACTION").is_some() {
            self.mods = false;
        }
        if lookup("DISABLE_COLOR_CACHE").is_some() {
            self.cache = false;
        }
        if let Some(p) = lookup("MINECRAFT_JAR_PATH").filter(|s| !s.is_empty()) {
            self.archive = Some(PathBuf::from(p));
        }
        if let Some(p) = lookup("MINECRAFT_MODS_PATH").filter(|s| !s.is_empty()) {
            self.mods_dir = Some(PathBuf::from(p));
        }
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(ColorCache::default_dir)
    }
}

fn extract_one(
    cache: Option<&ColorCache>,
    extractor: &dyn Extractor,
    kind: ArchiveKind,
    archive: &Path,
) -> Option<ColorMap> {
    let result = match cache {
        Some(c) => c.load_or_extract(kind, archive, extractor),
        None => extractor.extract(kind, archive),
    };
    match result {
        Ok(colors) => Some(colors),
        Err(e) => {
            log::warn!("{}; skipping", e);
            None
        }
    }
}

/// `<mc>` for a jar at `<mc>/versions/<name>/<name>.jar`.
fn install_of(jar: &Path) -> Option<PathBuf> {
    let versions = jar.parent()?.parent()?;
    if versions.file_name()? != "versions" {
        return None;
    }
    versions.parent().map(Path::to_path_buf)
}

fn mod_colors(
    opts: &ColorOptions,
    cache: Option<&ColorCache>,
    extractor: &dyn Extractor,
    save_dir: Option<&Path>,
    game_archive: Option<&Path>,
) -> ColorMap {
    let mc = save_dir
        .and_then(find_minecraft_dir)
        .or_else(|| game_archive.and_then(install_of));
    let Some(mods_dir) = find_mods_dir(mc.as_deref(), save_dir, opts.mods_dir.as_deref()) else {
        log::info!("no mods folder found");
        return ColorMap::new();
    };
    let jars = list_archives(&mods_dir);
    if jars.is_empty() {
        return ColorMap::new();
    }
    if let Some(c) = cache {
        if let Some(colors) = c.load_aggregate(&mods_dir, &jars) {
            log::info!(
                "loaded {} mod colours from aggregate cache for {}",
                colors.len(),
                mods_dir.display()
            );
            return colors;
        }
    }
    log::info!("scanning {} mod archives in {}", jars.len(), mods_dir.display());
    let mut colors = ColorMap::new();
    for jar in &jars {
        if let Some(found) = extract_one(cache, extractor, ArchiveKind::Mod, jar) {
            colors.extend(found);
        }
    }
    if let Some(c) = cache {
        if !colors.is_empty() {
            if let Err(e) = c.store_aggregate(&mods_dir, &colors) {
                log::warn!("{}", e);
            }
        }
    }
    colors
}

/// Built-in colours merged with whatever the options allow us to extract.
///
/// Archive and cache problems are logged and skipped; this always returns a table.
pub fn build_table(
    save_dir: Option<&Path>,
    opts: &ColorOptions,
    extractor: &dyn Extractor,
) -> ColorTable {
    let base = ColorTable::builtin();
    let cache = opts.cache.then(|| ColorCache::new(opts.cache_dir()));
    let mut extracted = ColorMap::new();

    let game_archive = if opts.extract {
        match save_dir {
            Some(dir) => find_game_archive(dir, opts.archive.as_deref()),
            None => opts.archive.clone().filter(|p| p.is_file()),
        }
    } else {
        None
    };
    match &game_archive {
        Some(jar) => {
            if let Some(colors) = extract_one(cache.as_ref(), extractor, ArchiveKind::Game, jar) {
                extracted.extend(colors);
            }
        }
        None if opts.extract => log::warn!("no game archive found, using built-in colours"),
        None => {}
    }

    if opts.mods {
        // Mods are applied after the game so their ids take precedence.
        extracted.extend(mod_colors(
            opts,
            cache.as_ref(),
            extractor,
            save_dir,
            game_archive.as_deref(),
        ));
    }

    let table = if extracted.is_empty() {
        base
    } else {
        base.merged_with(extracted)
    };
    log::info!("colour table has {} entries", table.len());

    if opts.snapshot {
        match table.write_snapshot(&opts.cache_dir()) {
            Ok(path) => log::info!("wrote colour snapshot {}", path.display()),
            Err(e) => log::warn!("cannot write colour snapshot: {}", e),
        }
    }
    table
}

pub fn build_resolver(
    save_dir: Option<&Path>,
    opts: &ColorOptions,
    extractor: &dyn Extractor,
) -> ColorResolver {
    ColorResolver::new(build_table(save_dir, opts, extractor))
}
