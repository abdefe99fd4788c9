//! Ordered progress events for a single capture.
//!
//! Events are pushed into an unbounded channel; percent never decreases
//! within one reporter, so a consumer can render a simple progress bar.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPhase {
    Initializing,
    Launching,
    Navigating,
    Scrolling,
    WaitingImages,
    WaitingFonts,
    WaitingAnimations,
    Capturing,
    Sections,
    Extracting,
    Complete,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub phase: ProgressPhase,
    pub percent: u8,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_section: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_sections: Option<usize>,
}

#[derive(Debug, Default)]
pub struct ProgressReporter {
    sender: Option<mpsc::UnboundedSender<ProgressEvent>>,
    last_percent: AtomicU8,
}

impl ProgressReporter {
    /// A reporter that only logs.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                sender: Some(tx),
                last_percent: AtomicU8::new(0),
            },
            rx,
        )
    }

    pub fn emit(&self, phase: ProgressPhase, percent: u8, message: impl Into<String>) {
        self.send(phase, percent, message.into(), None, None);
    }

    pub fn section(&self, percent: u8, current: usize, total: usize, message: impl Into<String>) {
        self.send(
            ProgressPhase::Sections,
            percent,
            message.into(),
            Some(current),
            Some(total),
        );
    }

    /// Maps `step` of `total` onto the `[from, to]` percent band.
    pub fn scaled(from: u8, to: u8, step: usize, total: usize) -> u8 {
        if total == 0 {
            return to;
        }
        let span = to.saturating_sub(from) as usize;
        from + (span * step.min(total) / total) as u8
    }

    fn send(
        &self,
        phase: ProgressPhase,
        percent: u8,
        message: String,
        current_section: Option<usize>,
        total_sections: Option<usize>,
    ) {
        let requested = percent.min(100);
        let previous = self.last_percent.fetch_max(requested, Ordering::SeqCst);
        let percent = previous.max(requested);
        debug!(?phase, percent, %message, "progress");
        if let Some(tx) = &self.sender {
            // A dropped receiver just means nobody is listening any more.
            let _ = tx.send(ProgressEvent {
                phase,
                percent,
                message,
                current_section,
                total_sections,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_monotonic() {
        let (reporter, mut rx) = ProgressReporter::channel();
        reporter.emit(ProgressPhase::Scrolling, 20, "scrolling");
        reporter.emit(ProgressPhase::WaitingImages, 10, "late event");
        reporter.emit(ProgressPhase::Complete, 100, "done");

        let percents: Vec<u8> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.percent)
            .collect();
        assert_eq!(percents, vec![20, 20, 100]);
    }

    #[test]
    fn silent_reporter_does_not_panic() {
        let reporter = ProgressReporter::silent();
        reporter.emit(ProgressPhase::Failed, 250, "clamped");
    }

    #[test]
    fn section_events_carry_counts() {
        let (reporter, mut rx) = ProgressReporter::channel();
        reporter.section(70, 2, 5, "section 2/5");
        let event = rx.try_recv().unwrap();
        assert_eq!(event.phase, ProgressPhase::Sections);
        assert_eq!(event.current_section, Some(2));
        assert_eq!(event.total_sections, Some(5));
    }

    #[test]
    fn scaled_maps_into_band() {
        assert_eq!(ProgressReporter::scaled(60, 90, 0, 3), 60);
        assert_eq!(ProgressReporter::scaled(60, 90, 3, 3), 90);
        assert_eq!(ProgressReporter::scaled(60, 90, 1, 3), 70);
        assert_eq!(ProgressReporter::scaled(60, 90, 1, 0), 90);
    }
}
