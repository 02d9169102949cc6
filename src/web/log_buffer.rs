//! Replay buffer for the progress stream of one run.
//!
//! Lines are append-only. Each subscriber owns a cursor into the buffer, so a
//! client that connects late first receives every earlier line and then each
//! new line, exactly once.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;

#[derive(Debug, Default)]
pub struct LogBuffer {
    lines: Mutex<Vec<String>>,
    appended: Notify,
}

impl LogBuffer {
    pub fn push(&self, line: String) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
        self.appended.notify_waiters();
    }

    pub fn len(&self) -> usize {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn get(&self, index: usize) -> Option<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
    }

    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        Subscription {
            buffer: Arc::clone(self),
            cursor: 0,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Next {
    Line(String),
    /// Nothing was appended within the idle window.
    Idle,
}

#[derive(Debug)]
pub struct Subscription {
    buffer: Arc<LogBuffer>,
    cursor: usize,
}

impl Subscription {
    /// The next unseen line, waiting up to `idle` for one to arrive.
    pub async fn next(&mut self, idle: Duration) -> Next {
        let deadline = tokio::time::Instant::now() + idle;
        loop {
            // Register before checking so a push between the check and the
            // await is not missed.
            let appended = self.buffer.appended.notified();
            tokio::pin!(appended);
            appended.as_mut().enable();

            if let Some(line) = self.buffer.get(self.cursor) {
                self.cursor += 1;
                return Next::Line(line);
            }

            tokio::select! {
                _ = &mut appended => {}
                _ = tokio::time::sleep_until(deadline) => return Next::Idle,
            }
        }
    }
}
