//! Progress reporting for batch runs.
//!
//! A run advances one counter per [`Stage`] for every image; overall progress
//! is the sum of the three counters against `files * 3`. Observers receive
//! that pair after every increment and are told once how the run ended.

use std::fmt;
use std::io::{self, Write};
use std::sync::Mutex;

use crate::pipeline::RunOutcome;

/// Per-image processing stages, in the order each image passes them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Decoding the source file
    Loading,
    /// Region detection and inpainting
    Inpainting,
    /// Optional page numbering and encoding to `output/`
    Writing,
}

impl Stage {
    /// All stages in processing order
    pub const ALL: [Stage; 3] = [Stage::Loading, Stage::Inpainting, Stage::Writing];

    /// Number of stages
    pub const COUNT: u64 = Self::ALL.len() as u64;

    /// Get the name of the stage
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Loading => "Loading",
            Stage::Inpainting => "Inpainting",
            Stage::Writing => "Writing",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Receives progress of a batch run.
///
/// Called from worker threads; implementations must be cheap and
/// thread-safe.
pub trait ProgressObserver: Send + Sync {
    /// Called after every counter increment with the summed counters and
    /// `files * 3`
    fn on_progress(&self, done: u64, total: u64);

    /// Called exactly once per started run, after the run lock is released
    fn on_finished(&self, outcome: &RunOutcome);
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&self, _done: u64, _total: u64) {}

    fn on_finished(&self, _outcome: &RunOutcome) {}
}

/// Progress as a whole percentage, clamped to 100
pub fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) * 100) / total) as u8
}

/// Progress bar width in characters
const PROGRESS_BAR_WIDTH: usize = 40;

/// Build a progress bar string
pub fn build_progress_bar(percent: u8) -> String {
    let percent = percent.min(100);
    let filled = (percent as usize * PROGRESS_BAR_WIDTH) / 100;
    let empty = PROGRESS_BAR_WIDTH - filled;
    format!("[{}{}]", "=".repeat(filled), "-".repeat(empty))
}

/// Plain-text observer for terminals without cursor control.
///
/// Redraws one line whenever the whole percentage changes.
#[derive(Debug, Default)]
pub struct TextProgress {
    last_percent: Mutex<Option<u8>>,
}

impl TextProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressObserver for TextProgress {
    fn on_progress(&self, done: u64, total: u64) {
        let current = percent(done, total);
        let Ok(mut last) = self.last_percent.lock() else {
            return;
        };
        if *last == Some(current) {
            return;
        }
        *last = Some(current);

        let mut stderr = io::stderr().lock();
        let _ = write!(
            stderr,
            "\r    {} {:3}% ({}/{})",
            build_progress_bar(current),
            current,
            done,
            total
        );
        let _ = stderr.flush();
    }

    fn on_finished(&self, outcome: &RunOutcome) {
        let _ = writeln!(io::stderr());
        let _ = writeln!(io::stderr(), "  {}", outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        assert_eq!(Stage::COUNT, 3);
        assert_eq!(Stage::ALL[0], Stage::Loading);
        assert_eq!(Stage::ALL[2], Stage::Writing);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Inpainting.to_string(), "Inpainting");
        assert_eq!(Stage::Loading.name(), "Loading");
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 9), 0);
        assert_eq!(percent(3, 9), 33);
        assert_eq!(percent(9, 9), 100);
        assert_eq!(percent(12, 9), 100);
        assert_eq!(percent(0, 0), 100);
    }

    #[test]
    fn test_build_progress_bar() {
        assert_eq!(
            build_progress_bar(0),
            "[----------------------------------------]"
        );
        assert_eq!(
            build_progress_bar(50),
            "[====================--------------------]"
        );
        assert_eq!(
            build_progress_bar(150),
            "[========================================]"
        );
    }

    #[test]
    fn test_text_progress_tracks_percent() {
        let progress = TextProgress::new();
        progress.on_progress(1, 3);
        progress.on_progress(1, 3);
        assert_eq!(*progress.last_percent.lock().unwrap(), Some(33));
        progress.on_progress(3, 3);
        assert_eq!(*progress.last_percent.lock().unwrap(), Some(100));
    }
}
