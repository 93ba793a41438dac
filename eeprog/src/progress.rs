//! Progress accounting for bulk transfers.
//!
//! Transfers report raw `(current, total)` pairs; [`ProgressMeter`] folds
//! them onto a fixed-width bar and only reports forward movement, so a
//! renderer never redraws a shorter bar within one operation.

/// Number of cells in a full bar.
pub const BAR_WIDTH: usize = 50;

/// Monotonic fill-level tracker for one transfer.
#[derive(Debug, Clone, Default)]
pub struct ProgressMeter {
    prev: usize,
    curr: usize,
    started: bool,
}

impl ProgressMeter {
    /// Create a meter at level zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `current` out of `total` onto `0..=BAR_WIDTH`.
    ///
    /// A zero `total` counts as complete.
    pub fn level_for(current: usize, total: usize) -> usize {
        if total == 0 {
            return BAR_WIDTH;
        }
        (current.saturating_mul(BAR_WIDTH) / total).min(BAR_WIDTH)
    }

    /// Record a new position.
    ///
    /// Returns the new fill level when it moved past the highest level shown
    /// so far, `None` otherwise.
    pub fn update(&mut self, current: usize, total: usize) -> Option<usize> {
        self.started = true;
        self.curr = Self::level_for(current, total);
        if self.curr > self.prev {
            self.prev = self.curr;
            Some(self.prev)
        } else {
            None
        }
    }

    /// Highest level shown so far.
    pub fn level(&self) -> usize {
        self.prev
    }

    /// Whether any position has been recorded.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Whether the last recorded position filled the bar.
    pub fn is_complete(&self) -> bool {
        self.curr >= BAR_WIDTH
    }
}
