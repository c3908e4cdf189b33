use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use overlook::{Config, Job, run, run_source};
use overlook_colors::{ArchiveKind, ColorMap, ExtractError, Extractor, Rgba, ZipExtractor};
use overlook_world::{ChunkPos, MemoryChunk, MemoryRegion};

fn offline_config(region_size: usize, cache: &Path) -> Config {
    let mut cfg = Config::default();
    cfg.scan.region_size = region_size;
    cfg.scan.workers = Some(2);
    cfg.colors.extract = false;
    cfg.colors.mods = false;
    cfg.colors.cache_dir = Some(cache.to_path_buf());
    cfg
}

fn job_in(dir: &Path) -> Job {
    Job {
        region: dir.join("world/region/r.0.0.mca"),
        grid_out: dir.join("out/blocks.json"),
        image_out: dir.join("out/map.png"),
        save_dir: None,
    }
}

fn pixel(path: &Path, x: u32, y: u32) -> [u8; 4] {
    image::open(path).unwrap().to_rgba8().get_pixel(x, y).0
}

#[test]
fn single_stone_chunk_renders_stone() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = offline_config(1, &dir.path().join("cache"));
    let job = job_in(dir.path());
    fs::create_dir_all(dir.path().join("out")).unwrap();
    let region = MemoryRegion::uniform(1, MemoryChunk::filled(-64, 69, "minecraft:stone"));

    let report = run_source(&cfg, &job, Arc::new(region), &ZipExtractor).unwrap();
    assert_eq!(report.stats.processed_chunks, 1);
    assert_eq!(report.missing_pixels, 0);

    let grid = overlook_io::load_grid(&job.grid_out).unwrap();
    assert_eq!((grid.width(), grid.height()), (16, 16));
    assert!(grid.cells().iter().all(|id| id.as_str() == "stone"));

    let img = image::open(&report.images.original).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (16, 16));
    assert!(img.pixels().all(|p| p.0 == [127, 127, 127, 255]));
    assert!(!report.images.downsampled);
    assert_eq!(pixel(&job.image_out, 15, 15), [127, 127, 127, 255]);
}

#[test]
fn missing_region_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = offline_config(1, &dir.path().join("cache"));
    let job = job_in(dir.path());
    assert!(run(&cfg, &job).is_err());
    assert!(!job.grid_out.exists());
    assert!(!job.image_out.exists());
    assert!(!dir.path().join("out").exists());
}

#[test]
fn corrupt_chunk_shows_as_magenta() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = offline_config(2, &dir.path().join("cache"));
    let job = job_in(dir.path());
    fs::create_dir_all(dir.path().join("out")).unwrap();
    let mut region = MemoryRegion::new();
    region.insert(ChunkPos::new(0, 0), MemoryChunk::filled(-64, 64, "grass_block"));
    region.insert_corrupt(ChunkPos::new(1, 0), "bad sector");

    let report = run_source(&cfg, &job, Arc::new(region), &ZipExtractor).unwrap();
    assert_eq!(report.stats.failed_chunks, 1);

    let grid = overlook_io::load_grid(&job.grid_out).unwrap();
    for z in 0..16 {
        for x in 0..16 {
            assert_eq!(grid.get(x, z).unwrap().as_str(), "grass_block");
            assert!(grid.get(x + 16, z).unwrap().is_none());
        }
    }
    let original = &report.images.original;
    assert_eq!(pixel(original, 5, 5), [67, 170, 55, 255]);
    assert_eq!(pixel(original, 21, 5), [255, 0, 255, 255]);
    // The two unpopulated chunks are magenta as well.
    assert_eq!(report.missing_pixels, 3 * 256);
}

#[test]
fn opaque_mode_fills_air() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = offline_config(1, &dir.path().join("cache"));
    cfg.render.opaque = true;
    let job = job_in(dir.path());
    fs::create_dir_all(dir.path().join("out")).unwrap();
    let region = MemoryRegion::uniform(1, MemoryChunk::hollow());

    let report = run_source(&cfg, &job, Arc::new(region), &ZipExtractor).unwrap();
    assert_eq!(pixel(&report.images.original, 0, 0), [255, 255, 255, 255]);
}

struct CountingExtractor(AtomicUsize);

impl Extractor for CountingExtractor {
    fn extract(&self, _kind: ArchiveKind, _path: &Path) -> Result<ColorMap, ExtractError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok([("mystery_block".to_string(), Rgba::rgb(1, 2, 3))]
            .into_iter()
            .collect())
    }
}

fn set_mtime(path: &Path, t: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(t)
        .unwrap();
}

#[test]
fn archive_is_extracted_once_until_it_changes() {
    let dir = tempfile::tempdir().unwrap();
    let archive: PathBuf = dir.path().join("client.jar");
    fs::write(&archive, b"jar").unwrap();
    set_mtime(&archive, SystemTime::now() - Duration::from_secs(7200));

    let mut cfg = offline_config(1, &dir.path().join("cache"));
    cfg.colors.extract = true;
    cfg.colors.archive = Some(archive.clone());
    let job = job_in(dir.path());
    fs::create_dir_all(dir.path().join("out")).unwrap();
    let region = Arc::new(MemoryRegion::uniform(
        1,
        MemoryChunk::filled(-64, 0, "mod:mystery_block"),
    ));
    let counter = CountingExtractor(AtomicUsize::new(0));

    let report = run_source(&cfg, &job, region.clone(), &counter).unwrap();
    assert_eq!(pixel(&report.images.original, 3, 3), [1, 2, 3, 255]);
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);

    run_source(&cfg, &job, region.clone(), &counter).unwrap();
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);

    set_mtime(&archive, SystemTime::now() - Duration::from_secs(3600));
    run_source(&cfg, &job, region.clone(), &counter).unwrap();
    assert_eq!(counter.0.load(Ordering::SeqCst), 2);

    run_source(&cfg, &job, region, &counter).unwrap();
    assert_eq!(counter.0.load(Ordering::SeqCst), 2);
}
