//! Region scanning: batch scheduling, progress and cancellation.
#![forbid(unsafe_code)]

pub mod batch;
pub mod progress;

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::unbounded;
use overlook_blocks::{BlockGrid, CHUNK_WIDTH};
use overlook_chunk::SampleInterval;
use overlook_world::{AnvilRegion, REGION_CHUNKS, RegionError, RegionSource, VerticalRange};
use rayon::ThreadPoolBuilder;

pub use batch::{BatchResult, Enumeration, enumerate_chunks, partition, run_batch};
pub use progress::{ProgressLog, ProgressSnapshot, ProgressTracker};

/// Upper bound on scan workers.
pub const MAX_WORKERS: usize = 32;

/// Cooperative cancellation flag shared with the caller.
///
/// Batches that have not started when the flag is raised are skipped;
/// running batches finish.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanRequest {
    /// Chunks per region side.
    pub region_size: usize,
    pub workers: usize,
    pub interval: SampleInterval,
    pub range: VerticalRange,
}

impl Default for ScanRequest {
    fn default() -> Self {
        Self {
            region_size: REGION_CHUNKS,
            workers: default_workers(),
            interval: SampleInterval::FULL,
            range: VerticalRange::default(),
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(MAX_WORKERS)
}

impl ScanRequest {
    /// Out-of-range values are corrected, never rejected.
    pub fn normalized(self) -> Self {
        let region_size = self.region_size.clamp(1, REGION_CHUNKS);
        let workers = self.workers.clamp(1, MAX_WORKERS);
        if region_size != self.region_size {
            log::warn!(
                "region size {} out of range, using {}",
                self.region_size,
                region_size
            );
        }
        if workers != self.workers {
            log::warn!("worker count {} out of range, using {}", self.workers, workers);
        }
        Self {
            region_size,
            workers,
            interval: SampleInterval::new(self.interval.get()),
            range: self.range,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScanStats {
    pub total_chunks: usize,
    pub processed_chunks: usize,
    pub failed_chunks: usize,
    pub block_types: usize,
    pub workers: usize,
    pub batches: usize,
    pub elapsed: Duration,
}

impl ScanStats {
    pub fn chunks_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            0.0
        } else {
            self.processed_chunks as f64 / secs
        }
    }
}

#[derive(Debug)]
pub struct ScanOutcome {
    pub grid: BlockGrid,
    pub stats: ScanStats,
}

/// Terminal scan failures; the caller gets no grid.
#[derive(Debug)]
pub enum ScanError {
    Region(RegionError),
    Cancelled,
    Pool(String),
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::Region(e) => write!(f, "{}", e),
            ScanError::Cancelled => write!(f, "scan cancelled"),
            ScanError::Pool(msg) => write!(f, "failed to start scan workers: {}", msg),
        }
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScanError::Region(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RegionError> for ScanError {
    fn from(e: RegionError) -> Self {
        ScanError::Region(e)
    }
}

/// Drives one region scan at a time on a fresh worker pool.
pub struct RegionScanner {
    request: ScanRequest,
    cancel: CancelToken,
    progress: ProgressTracker,
    thread_limit: Option<usize>,
}

impl RegionScanner {
    pub fn new(request: ScanRequest) -> Self {
        Self {
            request: request.normalized(),
            cancel: CancelToken::new(),
            progress: ProgressTracker::new(),
            thread_limit: None,
        }
    }

    /// Cap the pool threads below the worker count. Batches beyond the cap
    /// queue in order and are skipped if cancellation arrives first.
    pub fn with_thread_limit(mut self, threads: usize) -> Self {
        self.thread_limit = Some(threads.max(1));
        self
    }

    pub fn request(&self) -> &ScanRequest {
        &self.request
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn progress(&self) -> ProgressTracker {
        self.progress.clone()
    }

    /// Open an Anvil file and scan it. Open failures are terminal.
    pub fn scan_file(
        &self,
        path: &Path,
        on_progress: &mut dyn FnMut(usize, usize),
    ) -> Result<ScanOutcome, ScanError> {
        let region = AnvilRegion::open(path).map_err(|e| {
            log::error!("cannot open region {}: {}", path.display(), e);
            ScanError::Region(e)
        })?;
        self.scan(Arc::new(region), on_progress)
    }

    /// Scan `source` into a region grid.
    ///
    /// `on_progress` runs on the calling thread after each batch is merged,
    /// outside the progress lock, and once more with `(total, total)` at the end.
    pub fn scan(
        &self,
        source: Arc<dyn RegionSource>,
        on_progress: &mut dyn FnMut(usize, usize),
    ) -> Result<ScanOutcome, ScanError> {
        let req = self.request;
        let n = req.region_size;
        let (coords, how) = enumerate_chunks(source.as_ref(), n);
        let total = coords.len();
        let batches = partition(&coords, req.workers);
        let workers = req.workers.min(batches.len()).max(1);
        log::info!(
            "scanning {} chunks ({:?}) in {} batches on {} workers, sample interval {}",
            total,
            how,
            batches.len(),
            workers,
            req.interval.get()
        );

        self.progress.reset(total);
        let mut grid = BlockGrid::for_region(n);
        let mut reporter = ProgressLog::default();

        let threads = self.thread_limit.map_or(workers, |t| t.min(workers));
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("overlook-scan-{i}"))
            .build()
            .map_err(|e| ScanError::Pool(e.to_string()))?;

        let (tx, rx) = unbounded::<BatchResult>();
        let batch_count = batches.len();
        for (index, batch) in batches.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                break;
            }
            let tx = tx.clone();
            let source = Arc::clone(&source);
            let cancel = self.cancel.clone();
            let (interval, range) = (req.interval, req.range);
            pool.spawn(move || {
                let out = run_batch(index, source.as_ref(), &batch, interval, range, &cancel);
                let _ = tx.send(out);
            });
        }
        drop(tx);

        while let Ok(out) = rx.recv() {
            if out.skipped {
                log::debug!("batch {} skipped after cancellation", out.index);
                continue;
            }
            for (pos, cells) in &out.patches {
                grid.paste_square(pos.cx * CHUNK_WIDTH, pos.cz * CHUNK_WIDTH, CHUNK_WIDTH, cells);
            }
            let (processed, total) = self.progress.record(&out);
            reporter.observe(&self.progress.snapshot());
            on_progress(processed, total);
        }

        if self.cancel.is_cancelled() {
            log::warn!("scan cancelled, discarding partial grid");
            return Err(ScanError::Cancelled);
        }

        let snap = self.progress.snapshot();
        on_progress(total, total);
        let stats = ScanStats {
            total_chunks: total,
            processed_chunks: snap.processed_chunks,
            failed_chunks: snap.failed_chunks,
            block_types: snap.block_types,
            workers,
            batches: batch_count,
            elapsed: snap.elapsed,
        };
        log::info!(
            "scan done in {:.2}s: {} chunks processed, {} failed, {} block types, {:.1} chunks/s",
            stats.elapsed.as_secs_f64(),
            stats.processed_chunks,
            stats.failed_chunks,
            stats.block_types,
            stats.chunks_per_sec()
        );
        Ok(ScanOutcome { grid, stats })
    }
}
