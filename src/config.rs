use std::error::Error;
use std::fs;
use std::path::Path;

use overlook_chunk::SampleInterval;
use overlook_colors::ColorOptions;
use overlook_raster::MAX_DIMENSION;
use overlook_runtime::ScanRequest;
use overlook_world::{REGION_CHUNKS, VerticalRange};
use serde::Deserialize;

/// Everything a run can be configured with. Layers: defaults, TOML file,
/// environment, then command-line flags.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub colors: ColorOptions,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ScanConfig {
    /// Defaults to the available parallelism.
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default = "default_region_size")]
    pub region_size: usize,
    #[serde(default = "default_sample_interval")]
    pub sample_interval: usize,
    #[serde(default = "default_y_min")]
    pub y_min: i32,
    #[serde(default = "default_y_max")]
    pub y_max: i32,
}
fn default_region_size() -> usize {
    REGION_CHUNKS
}
fn default_sample_interval() -> usize {
    1
}
fn default_y_min() -> i32 {
    VerticalRange::default().min_y
}
fn default_y_max() -> i32 {
    VerticalRange::default().max_y
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: None,
            region_size: default_region_size(),
            sample_interval: default_sample_interval(),
            y_min: default_y_min(),
            y_max: default_y_max(),
        }
    }
}

impl ScanConfig {
    pub fn request(&self) -> ScanRequest {
        let defaults = ScanRequest::default();
        let range = if self.y_min <= self.y_max {
            VerticalRange::new(self.y_min, self.y_max)
        } else {
            log::warn!(
                "y range {}..{} is empty, using {}..{}",
                self.y_min,
                self.y_max,
                defaults.range.min_y,
                defaults.range.max_y
            );
            defaults.range
        };
        ScanRequest {
            region_size: self.region_size,
            workers: self.workers.unwrap_or(defaults.workers),
            interval: SampleInterval::new(self.sample_interval),
            range,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RenderConfig {
    /// Force alpha 255 on every pixel.
    #[serde(default)]
    pub opaque: bool,
    #[serde(default = "default_max_size")]
    pub max_size: u32,
}
fn default_max_size() -> u32 {
    MAX_DIMENSION
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            opaque: false,
            max_size: default_max_size(),
        }
    }
}

impl Config {
    pub fn from_path(path: &Path) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)
            .map_err(|e| format!("cannot read config {}: {}", path.display(), e))?;
        let cfg: Config = toml::from_str(&s)
            .map_err(|e| format!("cannot parse config {}: {}", path.display(), e))?;
        Ok(cfg)
    }

    /// Layer environment switches on top; `lookup` is usually `std::env::var(..).ok()`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.colors.apply_env(&lookup);
        if lookup("USE_OPAQUE_COLORS").is_some() {
            self.render.opaque = true;
        }
    }
}
