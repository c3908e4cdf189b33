//! Top-surface maps of Anvil regions.
#![forbid(unsafe_code)]

pub mod app;
pub mod config;

pub use app::{Job, Report, run, run_source};
pub use config::Config;
