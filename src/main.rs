use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use overlook::{Config, Job};
use overlook_colors::ColorCache;

#[derive(Parser, Debug)]
#[command(name = "overlook", about = "Render the top surface of a region file")]
struct Cli {
    /// Region file (`r.<x>.<z>.mca`)
    #[arg(required_unless_present = "clear_cache")]
    region: Option<PathBuf>,
    /// Block grid output
    #[arg(default_value = "blocks.json")]
    grid: PathBuf,
    /// Image output; the full-size copy goes next to it as `<name>_original.png`
    #[arg(default_value = "map.png")]
    image: PathBuf,
    /// Scan worker threads
    workers: Option<usize>,
    /// Chunks per region side (1-32)
    region_size: Option<usize>,
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Resolve every n-th column and copy the rest
    #[arg(long)]
    sample_interval: Option<usize>,
    /// Save folder used to locate the game install
    #[arg(long)]
    save_dir: Option<PathBuf>,
    /// Force alpha 255 on every pixel
    #[arg(long, default_value_t = false)]
    opaque: bool,
    /// Delete cached colours before running
    #[arg(long, default_value_t = false)]
    clear_cache: bool,
    /// Debug logging
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> Result<Config, Box<dyn Error>> {
    let mut cfg = match &cli.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };
    cfg.apply_env(|k| std::env::var(k).ok());
    if let Some(w) = cli.workers {
        cfg.scan.workers = Some(w);
    }
    if let Some(n) = cli.region_size {
        cfg.scan.region_size = n;
    }
    if let Some(s) = cli.sample_interval {
        cfg.scan.sample_interval = s;
    }
    if cli.opaque {
        cfg.render.opaque = true;
    }
    Ok(cfg)
}

fn real_main(cli: Cli) -> Result<(), Box<dyn Error>> {
    let cfg = load_config(&cli)?;
    if cli.clear_cache {
        ColorCache::new(cfg.colors.cache_dir()).clear()?;
    }
    let Some(region) = cli.region else {
        return Ok(());
    };
    let job = Job {
        region,
        grid_out: cli.grid,
        image_out: cli.image,
        save_dir: cli.save_dir,
    };
    let report = overlook::run(&cfg, &job)?;
    log::info!(
        "wrote {} and {}",
        job.grid_out.display(),
        report.images.bounded.display()
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match real_main(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
