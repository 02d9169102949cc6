//! Progress sinks.
//!
//! Every step of an album sync is narrated as a plain line of text through a
//! [`Reporter`]. Stream consumers watch for the two sentinel lines
//! [`DONE_MARKER`] and [`ERROR_MARKER`] to know when the run is over.

use tokio::sync::mpsc::UnboundedSender;

/// Terminal line for a run that finished (including "nothing to do").
pub const DONE_MARKER: &str = "__DONE__";
/// Terminal line for a run that aborted.
pub const ERROR_MARKER: &str = "__ERROR__";

pub fn is_terminal(line: &str) -> bool {
    line.starts_with(DONE_MARKER) || line.starts_with(ERROR_MARKER)
}

pub trait Reporter: Send + Sync {
    fn emit(&self, line: &str);
}

/// Prints progress to stdout. Sentinels are stream control, not output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn emit(&self, line: &str) {
        if !is_terminal(line) {
            println!("{line}");
        }
    }
}

/// Forwards lines over a channel to whatever owns the display (an event loop
/// or the web log buffer). Lines are dropped silently once the receiver is
/// gone.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: UnboundedSender<String>,
}

impl ChannelReporter {
    pub fn new(tx: UnboundedSender<String>) -> Self {
        Self { tx }
    }
}

impl Reporter for ChannelReporter {
    fn emit(&self, line: &str) {
        if self.tx.send(line.to_string()).is_err() {
            tracing::debug!("Progress receiver closed, dropping line");
        }
    }
}

/// Collects lines in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingReporter {
    lines: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingReporter {
    pub(crate) fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub(crate) fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

#[cfg(test)]
impl Reporter for RecordingReporter {
    fn emit(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}
