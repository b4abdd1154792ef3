//! Progress reporting for folder-sync
//!
//! The copy executor only talks to the [`Progress`] trait. The binary plugs in
//! an `indicatif` bar when the `progress` feature is enabled.

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Receives byte-level progress for each copy pass.
pub trait Progress: Sync {
    /// A new pass starts, expected to move `total_bytes`.
    fn begin(&self, label: &str, total_bytes: u64);
    fn advance(&self, bytes: u64);
    fn finish(&self);
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn begin(&self, _label: &str, _total_bytes: u64) {}
    fn advance(&self, _bytes: u64) {}
    fn finish(&self) {}
}

/// Terminal progress bar drawn on stderr.
#[cfg(feature = "progress")]
pub struct BarProgress {
    bar: ProgressBar,
}

#[cfg(feature = "progress")]
impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
        if let Ok(style) = ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {percent}% {msg}",
        ) {
            bar.set_style(style);
        }
        Self { bar }
    }
}

#[cfg(feature = "progress")]
impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "progress")]
impl Progress for BarProgress {
    fn begin(&self, label: &str, total_bytes: u64) {
        self.bar.reset();
        self.bar.set_length(total_bytes);
        self.bar.set_position(0);
        self.bar.set_message(label.to_string());
    }

    fn advance(&self, bytes: u64) {
        self.bar.inc(bytes);
    }

    fn finish(&self) {
        self.bar.finish();
    }
}
