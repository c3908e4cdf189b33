//! The end-to-end run: colours, scan, grid file, images.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use overlook_colors::{ColorResolver, Extractor, ZipExtractor, build_resolver};
use overlook_raster::{Written, rasterize, write_outputs};
use overlook_runtime::{RegionScanner, ScanError, ScanOutcome, ScanStats};
use overlook_world::RegionSource;

use crate::config::Config;

/// One region to process and where its artifacts go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    pub region: PathBuf,
    pub grid_out: PathBuf,
    pub image_out: PathBuf,
    /// Save folder used to find the game install; defaults to the region file's grandparent.
    pub save_dir: Option<PathBuf>,
}

impl Job {
    pub fn new(region: impl Into<PathBuf>) -> Self {
        Self {
            region: region.into(),
            grid_out: PathBuf::from("blocks.json"),
            image_out: PathBuf::from("map.png"),
            save_dir: None,
        }
    }

    pub fn save_dir(&self) -> Option<PathBuf> {
        self.save_dir.clone().or_else(|| {
            self.region
                .parent()
                .and_then(Path::parent)
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
        })
    }
}

#[derive(Clone, Debug)]
pub struct Report {
    pub stats: ScanStats,
    pub images: Written,
    pub missing_pixels: usize,
    pub elapsed: Duration,
}

fn log_progress(processed: usize, total: usize) {
    log::debug!("{}/{} chunks", processed, total);
}

/// Process the Anvil file named by `job`.
pub fn run(cfg: &Config, job: &Job) -> Result<Report, Box<dyn Error>> {
    run_with(cfg, job, &ZipExtractor, |scanner| {
        scanner.scan_file(&job.region, &mut log_progress)
    })
}

/// Process an already opened region source instead of `job.region`.
pub fn run_source(
    cfg: &Config,
    job: &Job,
    source: Arc<dyn RegionSource>,
    extractor: &dyn Extractor,
) -> Result<Report, Box<dyn Error>> {
    run_with(cfg, job, extractor, |scanner| {
        scanner.scan(source, &mut log_progress)
    })
}

fn run_with(
    cfg: &Config,
    job: &Job,
    extractor: &dyn Extractor,
    scan: impl FnOnce(&RegionScanner) -> Result<ScanOutcome, ScanError>,
) -> Result<Report, Box<dyn Error>> {
    let started = Instant::now();
    log::info!("region: {}", job.region.display());

    // Colours are settled before any chunk is read.
    let save_dir = job.save_dir();
    let colors = build_resolver(save_dir.as_deref(), &cfg.colors, extractor);

    let scanner = RegionScanner::new(cfg.scan.request());
    let outcome = scan(&scanner)?;
    let report = write_artifacts(cfg, job, &colors, outcome, started)?;
    log::info!("finished in {:.2}s", report.elapsed.as_secs_f64());
    Ok(report)
}

fn write_artifacts(
    cfg: &Config,
    job: &Job,
    colors: &ColorResolver,
    outcome: ScanOutcome,
    started: Instant,
) -> Result<Report, Box<dyn Error>> {
    let ScanOutcome { grid, stats } = outcome;
    if log::log_enabled!(log::Level::Debug) {
        let mut counts: Vec<_> = grid.histogram().into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        for (id, n) in counts.iter().take(10) {
            log::debug!("{:>8} {}", n, id);
        }
    }
    overlook_io::save_grid(&grid, &job.grid_out)
        .map_err(|e| format!("cannot write grid {}: {}", job.grid_out.display(), e))?;

    let raster = rasterize(&grid, colors, cfg.render.opaque)?;
    let images = write_outputs(&raster.image, &job.image_out, cfg.render.max_size)?;
    Ok(Report {
        stats,
        images,
        missing_pixels: raster.missing,
        elapsed: started.elapsed(),
    })
}
