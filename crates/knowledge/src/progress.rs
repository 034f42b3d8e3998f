//! Progress reporting for ingestion.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Stage of an ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Parse,
    Chunk,
    Embed,
    Index,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Parse => "parse",
            Phase::Chunk => "chunk",
            Phase::Embed => "embed",
            Phase::Index => "index",
        };
        f.write_str(name)
    }
}

/// Progress event emitted during ingestion.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: Phase,

    /// Units done so far (documents or chunks, depending on phase)
    pub current: u64,

    /// Total units, when known
    pub total: Option<u64>,

    pub message: String,

    /// Seconds since the reporter was created
    pub elapsed_secs: f64,
}

impl ProgressEvent {
    /// Percentage complete, when the total is known.
    pub fn percentage(&self) -> Option<f64> {
        self.total.map(|t| {
            if t > 0 {
                (self.current as f64 / t as f64) * 100.0
            } else {
                100.0
            }
        })
    }

    /// Format as a single human-readable line.
    pub fn format_simple(&self) -> String {
        let progress = match self.total {
            Some(total) => format!("{}/{}", self.current, total),
            None => self.current.to_string(),
        };
        let pct = self
            .percentage()
            .map(|p| format!(" ({:.0}%)", p))
            .unwrap_or_default();

        format!("[{}] {}{} - {}", self.phase, progress, pct, self.message)
    }
}

/// Callback for progress events.
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Emits progress events through an optional callback.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    start_time: Instant,
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::noop()
    }
}

impl ProgressReporter {
    /// Create a reporter that forwards events to `callback`.
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            start_time: Instant::now(),
        }
    }

    /// Create a reporter that only logs.
    pub fn noop() -> Self {
        Self {
            callback: None,
            start_time: Instant::now(),
        }
    }

    /// Emit an event.
    pub fn emit(&self, phase: Phase, current: u64, total: Option<u64>, message: impl Into<String>) {
        let event = ProgressEvent {
            phase,
            current,
            total,
            message: message.into(),
            elapsed_secs: self.start_time.elapsed().as_secs_f64(),
        };

        tracing::debug!(
            phase = %event.phase,
            current = event.current,
            total = ?event.total,
            message = %event.message,
            elapsed_secs = event.elapsed_secs,
            "Progress event"
        );

        if let Some(callback) = &self.callback {
            callback(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_progress_event_format() {
        let event = ProgressEvent {
            phase: Phase::Parse,
            current: 5,
            total: Some(10),
            message: "reading notes.txt".to_string(),
            elapsed_secs: 0.0,
        };
        let formatted = event.format_simple();
        assert_eq!(formatted, "[parse] 5/10 (50%) - reading notes.txt");
    }

    #[test]
    fn test_progress_reporter_emit() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();

        let reporter = ProgressReporter::new(Arc::new(move |event: &ProgressEvent| {
            sink.lock().unwrap().push(event.clone());
        }));
        reporter.emit(Phase::Embed, 3, Some(10), "model=mock");

        let captured = events.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].phase, Phase::Embed);
        assert_eq!(captured[0].current, 3);
    }

    #[test]
    fn test_noop_reporter() {
        ProgressReporter::noop().emit(Phase::Index, 1, None, "nothing listens");
    }
}
