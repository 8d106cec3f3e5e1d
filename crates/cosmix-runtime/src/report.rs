//! Reporting stream.
//!
//! Human-readable per-evaluation lines (`Likelihood = ...`) go through a
//! [`Reporter`], separate from `tracing` diagnostics. The CLI writes them to
//! stdout while logs go to stderr, so scripts can grep the stream.

use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

/// Sink for reporting lines.
pub trait Reporter: Send + Sync {
    /// Emits one line (without trailing newline).
    fn line(&self, text: &str);
}

/// Writes lines to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutReporter;

impl Reporter for StdoutReporter {
    fn line(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        // A closed stdout is not worth aborting a chain for.
        let _ = writeln!(out, "{text}");
    }
}

/// Discards lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn line(&self, _text: &str) {}
}

/// Collects lines in memory.
///
/// ```
/// use cosmix_runtime::report::{BufferReporter, Reporter};
///
/// let buffer = BufferReporter::new();
/// buffer.line("Likelihood = -1.5");
/// assert_eq!(buffer.lines(), vec!["Likelihood = -1.5".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BufferReporter {
    lines: Arc<Mutex<Vec<String>>>,
}

impl BufferReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// All lines joined with newlines.
    #[must_use]
    pub fn contents(&self) -> String {
        self.lines.lock().join("\n")
    }

    /// Lines containing `needle`.
    #[must_use]
    pub fn matching(&self, needle: &str) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|l| l.contains(needle))
            .cloned()
            .collect()
    }
}

impl Reporter for BufferReporter {
    fn line(&self, text: &str) {
        self.lines.lock().push(text.to_string());
    }
}

/// Formats a `Name = value` report line.
#[must_use]
pub fn value_line(name: &str, value: f64) -> String {
    format!("{name} = {value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_is_shared_between_clones() {
        let a = BufferReporter::new();
        let b = a.clone();
        b.line("Prior = 0");
        b.line("Likelihood = -2");
        assert_eq!(a.lines().len(), 2);
        assert_eq!(a.matching("Likelihood"), vec!["Likelihood = -2".to_string()]);
        assert_eq!(a.contents(), "Prior = 0\nLikelihood = -2");
    }

    #[test]
    fn value_line_format() {
        assert_eq!(value_line("Likelihood", -3.25), "Likelihood = -3.25");
        assert_eq!(value_line("Posterior", f64::NEG_INFINITY), "Posterior = -inf");
    }

    #[test]
    fn reporters_as_trait_objects() {
        let sinks: Vec<Arc<dyn Reporter>> = vec![Arc::new(NullReporter), Arc::new(BufferReporter::new())];
        for s in &sinks {
            s.line("x");
        }
    }
}
