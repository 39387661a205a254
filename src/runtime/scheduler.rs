//! Coalesced refresh scheduling.
//!
//! Data-change notifications do not run the pipeline directly. The
//! coordinator hands one [`RefreshTask`] to the host's scheduler and ignores
//! further changes until that task comes back through `CommandLayout::refresh`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Token for one deferred pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTask {
    sequence: u64,
}

impl RefreshTask {
    pub(crate) fn new(sequence: u64) -> Self {
        Self { sequence }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Host-provided deferral mechanism.
pub trait TaskScheduler: Send {
    fn schedule(&mut self, task: RefreshTask);
}

/// Queue-backed scheduler; the host decides when to drain it.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    queue: Arc<Mutex<VecDeque<RefreshTask>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop(&self) -> Option<RefreshTask> {
        self.queue.lock().ok().and_then(|mut guard| guard.pop_front())
    }

    pub fn len(&self) -> usize {
        self.queue.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TaskScheduler for ManualScheduler {
    fn schedule(&mut self, task: RefreshTask) {
        if let Ok(mut guard) = self.queue.lock() {
            guard.push_back(task);
        }
    }
}
