//! Console rendering of transfer progress.

use eeprog::ProgressMeter;
use eeprog::progress::BAR_WIDTH;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::use_fancy_output;

/// Progress bar for one read or write.
pub(crate) struct TransferBar {
    bar: ProgressBar,
    meter: ProgressMeter,
}

impl TransferBar {
    /// Create a bar, hidden in quiet mode or when stderr is not a terminal.
    pub(crate) fn new(message: &'static str, quiet: bool) -> Self {
        let bar = if quiet || !use_fancy_output() {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new(BAR_WIDTH as u64);
            let style = ProgressStyle::default_bar()
                .template("{msg} [{bar:50.cyan/blue}] {percent:>3}% {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> ");
            bar.set_style(style);
            bar.set_draw_target(ProgressDrawTarget::stderr());
            bar.set_message(message);
            bar
        };
        Self {
            bar,
            meter: ProgressMeter::new(),
        }
    }

    /// Feed a `(current, total)` report from the library.
    pub(crate) fn update(&mut self, current: usize, total: usize) {
        if let Some(level) = self
            .meter
            .update(current, total)
        {
            self.bar
                .set_position(level as u64);
        }
    }

    /// Finish the bar: kept when complete, left partial on failure, cleared
    /// when nothing was transferred.
    pub(crate) fn finish(self) {
        if self
            .meter
            .is_complete()
        {
            self.bar
                .finish();
        } else if self
            .meter
            .is_started()
        {
            self.bar
                .abandon();
        } else {
            self.bar
                .finish_and_clear();
        }
    }

    /// Highest level drawn so far.
    #[cfg(test)]
    pub(crate) fn level(&self) -> usize {
        self.meter
            .level()
    }
}
