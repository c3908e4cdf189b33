use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use hashbrown::HashSet;
use overlook_blocks::BlockId;

use crate::batch::BatchResult;

#[derive(Debug)]
struct ScanProgress {
    total_chunks: usize,
    processed_chunks: usize,
    failed_chunks: usize,
    found: HashSet<BlockId>,
    started: Instant,
}

impl ScanProgress {
    fn new(total_chunks: usize) -> Self {
        Self {
            total_chunks,
            processed_chunks: 0,
            failed_chunks: 0,
            found: HashSet::new(),
            started: Instant::now(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub total_chunks: usize,
    pub processed_chunks: usize,
    pub failed_chunks: usize,
    pub block_types: usize,
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    pub fn percent(&self) -> f64 {
        if self.total_chunks == 0 {
            return 100.0;
        }
        self.processed_chunks as f64 * 100.0 / self.total_chunks as f64
    }

    pub fn chunks_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.processed_chunks as f64 / secs
    }
}

/// Shared scan counters; one mutex, held only while merging a batch.
#[derive(Clone, Debug)]
pub struct ProgressTracker {
    inner: Arc<Mutex<ScanProgress>>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ScanProgress::new(0))),
        }
    }

    /// Start a new job: zero the counters and restart the clock.
    pub fn reset(&self, total_chunks: usize) {
        *self.inner.lock().unwrap() = ScanProgress::new(total_chunks);
    }

    /// Fold one finished batch in and return `(processed, total)`.
    pub fn record(&self, batch: &BatchResult) -> (usize, usize) {
        let mut p = self.inner.lock().unwrap();
        p.processed_chunks += batch.processed;
        p.failed_chunks += batch.failed;
        p.found.extend(batch.discovered.iter().cloned());
        (p.processed_chunks, p.total_chunks)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let p = self.inner.lock().unwrap();
        ProgressSnapshot {
            total_chunks: p.total_chunks,
            processed_chunks: p.processed_chunks,
            failed_chunks: p.failed_chunks,
            block_types: p.found.len(),
            elapsed: p.started.elapsed(),
        }
    }

    /// Distinct ids seen so far, sorted.
    pub fn block_types(&self) -> Vec<BlockId> {
        let p = self.inner.lock().unwrap();
        let mut ids: Vec<BlockId> = p.found.iter().cloned().collect();
        ids.sort();
        ids
    }
}

/// Logs scan progress at every 10% step.
#[derive(Debug, Default)]
pub struct ProgressLog {
    last_step: Option<usize>,
}

impl ProgressLog {
    pub fn observe(&mut self, snap: &ProgressSnapshot) {
        let step = (snap.percent() / 10.0).floor() as usize;
        if self.last_step.is_some_and(|s| s >= step) {
            return;
        }
        self.last_step = Some(step);
        log::info!(
            target: "progress",
            "processed {}/{} chunks ({:.0}%), {} block types, {:.1} chunks/s",
            snap.processed_chunks,
            snap.total_chunks,
            snap.percent(),
            snap.block_types,
            snap.chunks_per_sec()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn batch(processed: usize, failed: usize, ids: &[&str]) -> BatchResult {
        BatchResult {
            index: 0,
            patches: Vec::new(),
            discovered: ids.iter().map(|s| BlockId::new(s)).collect::<BTreeSet<_>>(),
            processed,
            failed,
            skipped: false,
        }
    }

    #[test]
    fn record_accumulates() {
        let t = ProgressTracker::new();
        t.reset(10);
        assert_eq!(t.record(&batch(4, 1, &["stone", "none"])), (4, 10));
        assert_eq!(t.record(&batch(6, 0, &["stone", "dirt"])), (10, 10));
        let snap = t.snapshot();
        assert_eq!(snap.failed_chunks, 1);
        assert_eq!(snap.block_types, 3);
        assert_eq!(snap.percent(), 100.0);
        assert_eq!(
            t.block_types(),
            vec![BlockId::new("dirt"), BlockId::none(), BlockId::new("stone")]
        );
    }

    #[test]
    fn reset_clears_previous_job() {
        let t = ProgressTracker::new();
        t.reset(2);
        t.record(&batch(2, 0, &["sand"]));
        t.reset(5);
        let snap = t.snapshot();
        assert_eq!(snap.processed_chunks, 0);
        assert_eq!(snap.total_chunks, 5);
        assert_eq!(snap.block_types, 0);
    }

    #[test]
    fn empty_job_is_complete() {
        let t = ProgressTracker::new();
        assert_eq!(t.snapshot().percent(), 100.0);
    }
}
