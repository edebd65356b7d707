//! Trace sinks
//!
//! A trace sink receives one human-readable line per progress or diagnostic
//! event. It is write-only: the solver never reads it back.

use std::sync::Mutex;

/// Line-oriented progress output
pub trait TraceSink: Send + Sync {
    /// Receive one line of text
    fn line(&self, message: &str);
}

/// Forwards every line to the `log` crate at `info` level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTrace;

impl TraceSink for LogTrace {
    fn line(&self, message: &str) {
        log::info!("{}", message);
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTrace;

impl TraceSink for NullTrace {
    fn line(&self, _message: &str) {}
}

/// Keeps every line in memory
#[derive(Debug, Default)]
pub struct BufferTrace {
    lines: Mutex<Vec<String>>,
}

impl BufferTrace {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the recorded lines
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// True if any recorded line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

impl TraceSink for BufferTrace {
    fn line(&self, message: &str) {
        match self.lines.lock() {
            Ok(mut lines) => lines.push(message.to_string()),
            Err(poisoned) => poisoned.into_inner().push(message.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_trace() {
        let trace = BufferTrace::new();
        trace.line("assembling 12 rows");
        trace.line("factorized");
        assert_eq!(trace.lines().len(), 2);
        assert!(trace.contains("factorized"));
        assert!(!trace.contains("cancelled"));
    }
}
