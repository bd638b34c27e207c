//! Progress bars for the long phases of a run
//!
//! A run has two passes worth showing: fingerprinting grid cells and
//! exporting unique tiles. Bars can be hidden so the same code path runs
//! quietly in batch mode and in tests.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

// ============================================================================
// Styles
// ============================================================================

/// Get the progress bar style for cell and export passes
fn progress_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {spinner:.green} [{bar:40.cyan/dim}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━━╾─")
}

/// Get the style for completed progress bars
fn completed_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  ✓ [{bar:40.green/dim}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━━━")
}

// ============================================================================
// Tile pass progress tracker
// ============================================================================

/// Progress tracker for one pass over cells or tiles
pub struct TileProgress {
    progress_bar: ProgressBar,
    start_time: Instant,
    label: &'static str,
}

impl TileProgress {
    /// Create a visible tracker for `total` items
    pub fn new(total: u64, label: &'static str) -> Self {
        let progress_bar = ProgressBar::new(total);
        progress_bar.set_style(progress_bar_style());
        progress_bar.enable_steady_tick(Duration::from_millis(100));
        progress_bar.set_message(label);

        Self::with_bar(progress_bar, label)
    }

    /// Create a tracker that draws nothing
    pub fn hidden(total: u64, label: &'static str) -> Self {
        Self::with_bar(ProgressBar::hidden(), label).with_length(total)
    }

    fn with_bar(progress_bar: ProgressBar, label: &'static str) -> Self {
        Self {
            progress_bar,
            start_time: Instant::now(),
            label,
        }
    }

    fn with_length(self, total: u64) -> Self {
        self.progress_bar.set_length(total);
        self
    }

    /// Set the total once it is known
    pub fn set_length(&self, total: u64) {
        self.progress_bar.set_length(total);
    }

    /// Set the absolute position and the running unique-tile count
    pub fn update(&self, position: usize, unique: usize) {
        self.progress_bar.set_position(position as u64);
        self.progress_bar
            .set_message(format!("{} ({} unique)", self.label, unique));
    }

    /// Advance by one, showing `msg`
    pub fn inc(&self, msg: &str) {
        self.progress_bar.inc(1);
        self.progress_bar
            .set_message(format!("{}: {}", self.label, msg));
    }

    /// Set the absolute position only
    pub fn set_position(&self, position: usize) {
        self.progress_bar.set_position(position as u64);
    }

    /// Current position
    pub fn position(&self) -> u64 {
        self.progress_bar.position()
    }

    /// Finish the progress display
    pub fn finish(&self) {
        self.progress_bar.set_style(completed_style());
        let elapsed = self.start_time.elapsed();
        self.progress_bar.finish_with_message(format!(
            "{} complete in {}",
            self.label,
            format_duration(elapsed)
        ));
    }

    /// Finish with an error
    pub fn finish_with_error(&self, msg: &str) {
        self.progress_bar.abandon_with_message(format!("✗ {}", msg));
    }
}

// ============================================================================
// Utility functions
// ============================================================================

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        format!("{}h {}m", hours, mins)
    } else if secs >= 60 {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30.0s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m");
    }

    #[test]
    fn test_hidden_tile_progress() {
        let progress = TileProgress::hidden(16, "Fingerprinting");
        progress.update(4, 2);
        assert_eq!(progress.position(), 4);
        progress.set_position(16);
        assert_eq!(progress.position(), 16);
        progress.finish();
    }
}
