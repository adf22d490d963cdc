//! Adaptive page sizing: steer per-page fetch time toward a target.

use std::collections::VecDeque;
use std::time::Duration;

use log::debug;

use crate::utils::config::LoaderConsts;

/// Knobs for the page-size controller and chunking. The literals in
/// [`LoaderConsts`] are the defaults; `.schemax.toml` can move the page
/// time target, and library callers can override any field.
#[derive(Clone, Debug)]
pub struct TuningConfig {
    /// Page fetch duration to steer toward.
    pub target_page_time: Duration,
    pub min_batch: usize,
    pub max_batch: usize,
    /// New size as a percent of the old when pages run fast (150 = +50%).
    pub grow_percent: usize,
    /// New size as a percent of the old when pages run slow (70 = -30%).
    pub shrink_percent: usize,
    /// Trailing page timings averaged per decision.
    pub window: usize,
    /// Hard cap on the first chunk regardless of the requested budget.
    pub first_chunk_cap: usize,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            target_page_time: Duration::from_millis(LoaderConsts::TARGET_PAGE_MS),
            min_batch: LoaderConsts::MIN_BATCH,
            max_batch: LoaderConsts::MAX_BATCH,
            grow_percent: LoaderConsts::GROW_PERCENT,
            shrink_percent: LoaderConsts::SHRINK_PERCENT,
            window: LoaderConsts::TIMING_WINDOW,
            first_chunk_cap: LoaderConsts::FIRST_CHUNK_CAP,
        }
    }
}

/// Page-size controller. Keeps a trailing window of page fetch times;
/// once the window is full, every new page re-checks the average: fast
/// pages (below half the target) grow the size, slow pages (above 1.5x
/// the target) shrink it, always clamped to [min, max].
#[derive(Debug)]
pub struct AdaptiveBatcher {
    tuning: TuningConfig,
    size: usize,
    window: VecDeque<Duration>,
}

impl AdaptiveBatcher {
    /// Seed the controller. The seed is clamped into the configured range.
    pub fn new(seed: usize, tuning: TuningConfig) -> Self {
        let size = seed.clamp(tuning.min_batch, tuning.max_batch);
        Self {
            tuning,
            size,
            window: VecDeque::new(),
        }
    }

    /// Current page size.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Feed one page's wall-clock fetch time and retune if warranted.
    pub fn record(&mut self, elapsed: Duration) {
        // a configured window of zero still averages over one sample
        let window = self.tuning.window.max(1);
        self.window.push_back(elapsed);
        if self.window.len() > window {
            self.window.pop_front();
        }
        if self.window.len() < window {
            return;
        }
        let avg = self.window.iter().sum::<Duration>() / self.window.len() as u32;
        let target = self.tuning.target_page_time;
        let next = if avg < target / 2 {
            self.size * self.tuning.grow_percent / 100
        } else if avg > target * 3 / 2 {
            self.size * self.tuning.shrink_percent / 100
        } else {
            return;
        };
        let next = next.clamp(self.tuning.min_batch, self.tuning.max_batch);
        if next != self.size {
            debug!("batch size {} -> {next} (avg page {avg:?})", self.size);
            self.size = next;
        }
    }
}
