use std::sync::{Arc, Mutex, PoisonError};

use chrono::Local;

#[derive(Debug, Default)]
struct JobState {
    running: bool,
    last_run: Option<String>,
}

/// At most one album sync runs at a time. A second start is refused rather
/// than queued.
#[derive(Debug, Default)]
pub struct JobSlot {
    state: Mutex<JobState>,
}

impl JobSlot {
    pub fn try_start(self: &Arc<Self>) -> Option<JobGuard> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.running {
            return None;
        }
        state.running = true;
        Some(JobGuard {
            slot: Arc::clone(self),
        })
    }

    pub fn is_running(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .running
    }

    /// Local time the last run ended, ISO 8601.
    pub fn last_run(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_run
            .clone()
    }
}

/// Held by the worker; frees the slot when dropped, also during unwinding.
#[derive(Debug)]
pub struct JobGuard {
    slot: Arc<JobSlot>,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        let mut state = self
            .slot
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.running = false;
        state.last_run = Some(Local::now().format("%Y-%m-%dT%H:%M:%S").to_string());
    }
}
