//! Progress reporting for long-running stages.

use std::fmt;

/// Which stage produced a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Collecting,
    Scraping,
    Geocoding,
    Classifying,
}

impl Stage {
    fn verb(&self) -> &'static str {
        match self {
            Stage::Collecting => "Collecting",
            Stage::Scraping => "Scraping",
            Stage::Geocoding => "Enriching location",
            Stage::Classifying => "AI enhancing",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// One unit of completed work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub stage: Stage,
    /// 1-based index of the unit just finished.
    pub current: usize,
    pub total: usize,
    pub message: String,
}

impl ProgressEvent {
    pub fn new(stage: Stage, current: usize, total: usize) -> Self {
        Self {
            stage,
            current,
            total,
            message: format!("{}: {}/{}", stage, current, total),
        }
    }

    /// Completion ratio in `[0.0, 1.0]`.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        (self.current as f32 / self.total as f32).min(1.0)
    }
}

/// Receives progress synchronously, on the task running the stage.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Observer that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
