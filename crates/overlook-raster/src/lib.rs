//! Block grid to image.
#![forbid(unsafe_code)]

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbaImage};
use overlook_blocks::BlockGrid;
use overlook_colors::{ColorResolver, Rgba};

/// Longest side of the bounded copy.
pub const MAX_DIMENSION: u32 = 2048;

#[derive(Debug)]
pub enum RasterError {
    EmptyGrid,
    TooLarge { width: usize, height: usize },
    Write { path: PathBuf, reason: String },
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterError::EmptyGrid => write!(f, "grid has no cells"),
            RasterError::TooLarge { width, height } => {
                write!(f, "grid {}x{} does not fit an image", width, height)
            }
            RasterError::Write { path, reason } => {
                write!(f, "cannot write image {}: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for RasterError {}

/// A rendered grid and how many of its pixels are sentinel magenta.
#[derive(Clone, Debug)]
pub struct Raster {
    pub image: RgbaImage,
    pub missing: usize,
}

impl Raster {
    pub fn missing_percent(&self) -> f64 {
        let total = u64::from(self.image.width()) * u64::from(self.image.height());
        if total == 0 {
            0.0
        } else {
            self.missing as f64 * 100.0 / total as f64
        }
    }
}

/// One pixel per cell; `none` and blank ids become opaque magenta.
///
/// With `opaque` every pixel gets alpha 255, including air.
pub fn rasterize(
    grid: &BlockGrid,
    colors: &ColorResolver,
    opaque: bool,
) -> Result<Raster, RasterError> {
    if grid.width() == 0 || grid.height() == 0 {
        return Err(RasterError::EmptyGrid);
    }
    let too_large = || RasterError::TooLarge {
        width: grid.width(),
        height: grid.height(),
    };
    let w = u32::try_from(grid.width()).map_err(|_| too_large())?;
    let h = u32::try_from(grid.height()).map_err(|_| too_large())?;

    let mut image = RgbaImage::new(w, h);
    let mut missing = 0usize;
    for (z, row) in grid.rows().enumerate() {
        for (x, id) in row.iter().enumerate() {
            let mut c = if id.is_blank() || id.is_none() {
                missing += 1;
                Rgba::MISSING
            } else {
                colors.resolve_block(id)
            };
            if opaque {
                c = c.opaque();
            }
            image.put_pixel(x as u32, z as u32, c.into());
        }
    }
    let raster = Raster { image, missing };
    if missing > 0 {
        log::warn!(
            "{} of {} pixels have no block data ({:.2}%)",
            missing,
            grid.cells().len(),
            raster.missing_percent()
        );
    } else {
        log::debug!("rasterized {}x{} with no missing pixels", w, h);
    }
    Ok(raster)
}

/// Size of `(w, h)` scaled so the longer side is `max`; `None` if it already fits.
pub fn bounded_size(w: u32, h: u32, max: u32) -> Option<(u32, u32)> {
    if w <= max && h <= max {
        return None;
    }
    let scaled = |short: u32, long: u32| {
        ((u64::from(max) * u64::from(short) / u64::from(long)) as u32).max(1)
    };
    Some(if w >= h {
        (max, scaled(h, w))
    } else {
        (scaled(w, h), max)
    })
}

/// Lanczos-downsampled copy when the image exceeds `max` on either side.
pub fn thumbnail(image: &RgbaImage, max: u32) -> Option<RgbaImage> {
    let (w, h) = bounded_size(image.width(), image.height(), max)?;
    log::info!(
        "downsampling {}x{} to {}x{}",
        image.width(),
        image.height(),
        w,
        h
    );
    Some(imageops::resize(image, w, h, FilterType::Lanczos3))
}

/// `<dir>/<stem>_original.png` for an output path.
pub fn original_path(out: &Path) -> PathBuf {
    let stem = out
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "map".to_string());
    let ext = out
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "png".to_string());
    out.with_file_name(format!("{}_original.{}", stem, ext))
}

/// Paths written by [`write_outputs`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Written {
    pub original: PathBuf,
    pub bounded: PathBuf,
    pub downsampled: bool,
}

fn save(image: &RgbaImage, path: &Path) -> Result<(), RasterError> {
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| RasterError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Write the full image to `<stem>_original.png` and a copy no larger than
/// `max` on either side to `out`. Any extension other than `.png` is refused
/// before anything is written.
pub fn write_outputs(image: &RgbaImage, out: &Path, max: u32) -> Result<Written, RasterError> {
    if let Some(ext) = out.extension() {
        if ImageFormat::from_extension(ext) != Some(ImageFormat::Png) {
            return Err(RasterError::Write {
                path: out.to_path_buf(),
                reason: "only .png output is supported".to_string(),
            });
        }
    }
    if let Some(dir) = out.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| RasterError::Write {
            path: out.to_path_buf(),
            reason: e.to_string(),
        })?;
    }
    let original = original_path(out);
    save(image, &original)?;
    log::info!(
        "saved {}x{} image to {}",
        image.width(),
        image.height(),
        original.display()
    );
    let small = thumbnail(image, max);
    save(small.as_ref().unwrap_or(image), out)?;
    log::info!("saved bounded image to {}", out.display());
    Ok(Written {
        original,
        bounded: out.to_path_buf(),
        downsampled: small.is_some(),
    })
}
