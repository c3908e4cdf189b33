//! Block colours: built-in table, texture extraction, on-disk cache and lookup.
#![forbid(unsafe_code)]

pub mod cache;
pub mod color;
pub mod discover;
pub mod extract;
pub mod palette;
pub mod resolver;
pub mod sources;
pub mod table;

use std::collections::BTreeMap;

/// Extracted colours keyed by id. Ordered so association passes are deterministic.
pub type ColorMap = BTreeMap<String, Rgba>;

pub use cache::{CacheError, ColorCache};
pub use color::Rgba;
pub use extract::{ArchiveKind, ExtractError, Extractor, ZipExtractor};
pub use resolver::{ColorResolver, synthesize};
pub use sources::{ColorOptions, build_resolver, build_table};
pub use table::ColorTable;
