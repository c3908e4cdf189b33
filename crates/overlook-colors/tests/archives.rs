use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use overlook_colors::{
    ArchiveKind, ColorCache, ColorMap, ColorOptions, ExtractError, Extractor, Rgba, ZipExtractor,
    build_resolver,
};
use zip::write::SimpleFileOptions;

fn png(color: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(16, 16, image::Rgba(color));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn write_jar(path: &Path, entries: &[(&str, Vec<u8>)]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    for (name, bytes) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap();
}

fn set_mtime(path: &Path, t: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(t)
        .unwrap();
}

fn an_hour_ago() -> SystemTime {
    SystemTime::now() - Duration::from_secs(3600)
}

#[derive(Default)]
struct CountingExtractor {
    game: AtomicUsize,
    mods: AtomicUsize,
}

impl Extractor for CountingExtractor {
    fn extract(&self, kind: ArchiveKind, path: &Path) -> Result<ColorMap, ExtractError> {
        match kind {
            ArchiveKind::Game => self.game.fetch_add(1, Ordering::SeqCst),
            ArchiveKind::Mod => self.mods.fetch_add(1, Ordering::SeqCst),
        };
        ZipExtractor.extract(kind, path)
    }
}

fn game_jar(path: &Path) {
    write_jar(
        path,
        &[
            (
                "assets/minecraft/textures/block/mystery_ore.png",
                png([40, 80, 120, 255]),
            ),
            (
                "assets/minecraft/textures/block/stone.png",
                png([1, 2, 3, 255]),
            ),
            (
                "assets/minecraft/blockstates/mystery_ore_slab.json",
                b"{}".to_vec(),
            ),
            ("assets/minecraft/textures/block/leaf.png", png([0, 0, 0, 0])),
        ],
    );
}

#[test]
fn game_archive_textures_and_blockstates() {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("client.jar");
    game_jar(&jar);
    let colors = ZipExtractor.extract(ArchiveKind::Game, &jar).unwrap();
    assert_eq!(colors["mystery_ore"], Rgba::rgb(40, 80, 120));
    assert_eq!(colors["mystery_ore_slab"], Rgba::rgb(40, 80, 120));
    assert!(!colors.contains_key("leaf"));
    assert_eq!(colors["minecraft:grass_block"], Rgba::rgb(67, 170, 55));
}

#[test]
fn mod_archive_uses_both_keys() {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("Gears-1.0.jar");
    write_jar(
        &jar,
        &[
            ("fabric.mod.json", br#"{"id": "gears"}"#.to_vec()),
            ("assets/gears/textures/block/cog.png", png([200, 100, 0, 255])),
            ("assets/gears/textures/item/wrench.png", png([9, 9, 9, 255])),
        ],
    );
    let colors = ZipExtractor.extract(ArchiveKind::Mod, &jar).unwrap();
    assert_eq!(colors.len(), 2);
    assert_eq!(colors["gears:cog"], Rgba::rgb(200, 100, 0));
    assert_eq!(colors["cog"], Rgba::rgb(200, 100, 0));
}

#[test]
fn not_a_zip_is_an_archive_error() {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("broken.jar");
    fs::write(&jar, b"definitely not a zip").unwrap();
    let err = ZipExtractor.extract(ArchiveKind::Mod, &jar).unwrap_err();
    assert!(matches!(err, ExtractError::Archive { .. }), "{err}");
}

#[test]
fn stale_archive_is_extracted_again_and_fresh_one_is_not() {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("client.jar");
    game_jar(&jar);
    set_mtime(&jar, an_hour_ago());
    let cache = ColorCache::new(dir.path().join("cache"));
    let counter = CountingExtractor::default();

    let first = cache
        .load_or_extract(ArchiveKind::Game, &jar, &counter)
        .unwrap();
    let old_entry = cache.entry_path(&jar).unwrap();
    assert!(old_entry.is_file());
    assert_eq!(counter.game.load(Ordering::SeqCst), 1);

    let again = cache
        .load_or_extract(ArchiveKind::Game, &jar, &counter)
        .unwrap();
    assert_eq!(again, first);
    assert_eq!(counter.game.load(Ordering::SeqCst), 1);

    set_mtime(&jar, SystemTime::now());
    cache
        .load_or_extract(ArchiveKind::Game, &jar, &counter)
        .unwrap();
    assert_eq!(counter.game.load(Ordering::SeqCst), 2);
    let new_entry = cache.entry_path(&jar).unwrap();
    assert_ne!(new_entry, old_entry);
    assert!(new_entry.is_file());
    assert!(!old_entry.exists());

    cache
        .load_or_extract(ArchiveKind::Game, &jar, &counter)
        .unwrap();
    assert_eq!(counter.game.load(Ordering::SeqCst), 2);
}

struct Install {
    _root: tempfile::TempDir,
    save: PathBuf,
    mods: PathBuf,
    cache: PathBuf,
}

fn install() -> Install {
    let root = tempfile::tempdir().unwrap();
    let mc = root.path().join("minecraft");
    let jar = mc.join("versions/1.21/1.21.jar");
    game_jar(&jar);
    set_mtime(&jar, an_hour_ago());
    let mods = mc.join("mods");
    for (name, color) in [("alpha", [10, 10, 200, 255]), ("beta", [250, 250, 10, 255])] {
        let path = mods.join(format!("{name}.jar"));
        let texture = format!("assets/{name}/textures/block/{name}_brick.png");
        write_jar(&path, &[(texture.as_str(), png(color))]);
        set_mtime(&path, an_hour_ago());
    }
    let save = mc.join("saves/world-1.21");
    fs::create_dir_all(&save).unwrap();
    let cache = root.path().join("cache");
    Install {
        save,
        mods,
        cache,
        _root: root,
    }
}

#[test]
fn resolver_combines_game_and_mods_and_reuses_caches() {
    let inst = install();
    let opts = ColorOptions {
        cache_dir: Some(inst.cache.clone()),
        snapshot: true,
        ..ColorOptions::default()
    };
    let counter = CountingExtractor::default();
    let resolver = build_resolver(Some(&inst.save), &opts, &counter);

    assert_eq!(resolver.resolve("minecraft:stone"), Rgba::rgb(127, 127, 127));
    assert_eq!(resolver.resolve("mystery_ore"), Rgba::rgb(40, 80, 120));
    assert_eq!(resolver.resolve("alpha:alpha_brick"), Rgba::rgb(10, 10, 200));
    assert_eq!(resolver.resolve("beta_brick"), Rgba::rgb(250, 250, 10));
    assert_eq!(counter.game.load(Ordering::SeqCst), 1);
    assert_eq!(counter.mods.load(Ordering::SeqCst), 2);

    let cache = ColorCache::new(&inst.cache);
    assert!(cache.aggregate_path(&inst.mods).is_file());
    let snapshots = fs::read_dir(&inst.cache)
        .unwrap()
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().starts_with("block_colors_"))
        .count();
    assert_eq!(snapshots, 1);

    let again = build_resolver(Some(&inst.save), &opts, &counter);
    assert_eq!(again.resolve("beta_brick"), Rgba::rgb(250, 250, 10));
    assert_eq!(counter.game.load(Ordering::SeqCst), 1);
    assert_eq!(counter.mods.load(Ordering::SeqCst), 2);
}

#[test]
fn disabled_sources_fall_back_to_builtins() {
    let inst = install();
    let opts = ColorOptions {
        extract: false,
        mods: false,
        cache_dir: Some(inst.cache.clone()),
        ..ColorOptions::default()
    };
    let counter = CountingExtractor::default();
    let resolver = build_resolver(Some(&inst.save), &opts, &counter);
    assert_eq!(counter.game.load(Ordering::SeqCst), 0);
    assert_eq!(counter.mods.load(Ordering::SeqCst), 0);
    assert_eq!(resolver.resolve("mystery_ore"), overlook_colors::synthesize("mystery_ore"));
}

#[test]
fn broken_mod_is_skipped() {
    let inst = install();
    fs::write(inst.mods.join("zz_broken.jar"), b"nope").unwrap();
    let opts = ColorOptions {
        cache: false,
        cache_dir: Some(inst.cache.clone()),
        ..ColorOptions::default()
    };
    let resolver = build_resolver(Some(&inst.save), &opts, &ZipExtractor);
    assert_eq!(resolver.resolve("alpha_brick"), Rgba::rgb(10, 10, 200));
    assert!(!inst.cache.exists());
}
