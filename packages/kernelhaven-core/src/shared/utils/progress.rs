//! Periodic progress reporting for long-running extractions

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Counts processed items and logs progress at most once per interval.
///
/// Shared by all worker threads of one extractor run.
pub struct ProgressLogger {
    name: String,
    total: usize,
    done: AtomicUsize,
    started: Instant,
    interval: Duration,
    last_report: Mutex<Instant>,
}

impl ProgressLogger {
    pub fn new(name: impl Into<String>, total: usize, interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            name: name.into(),
            total,
            done: AtomicUsize::new(0),
            started: now,
            interval,
            last_report: Mutex::new(now),
        }
    }

    /// Record one finished item.
    pub fn processed_one(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;

        if self.interval.is_zero() {
            return;
        }
        let mut last = self.last_report.lock();
        if last.elapsed() >= self.interval {
            *last = Instant::now();
            tracing::info!(
                extractor = %self.name,
                done,
                total = self.total,
                percent = percent(done, self.total),
                "Extraction progress"
            );
        }
    }

    pub fn processed(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }

    /// Log the final summary.
    pub fn close(&self) {
        tracing::info!(
            extractor = %self.name,
            done = self.processed(),
            total = self.total,
            elapsed = ?self.started.elapsed(),
            "Extraction finished"
        );
    }
}

fn percent(done: usize, total: usize) -> usize {
    if total == 0 {
        100
    } else {
        done * 100 / total
    }
}
