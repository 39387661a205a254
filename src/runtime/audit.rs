//! Pipeline audit hooks.
//!
//! Records capture each stage transition of `CommandLayout` plus structured
//! metadata, so callers can trace why a layout ran, stalled or was skipped
//! without instrumenting the pipeline itself.

use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use serde_json::Value;

use crate::layout::LayoutStage;

/// Checkpoints emitted by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineAuditStage {
    /// A stage handler is about to run.
    StageEntered(LayoutStage),
    /// A stage handler finished successfully.
    StageCompleted(LayoutStage),
    /// A stage could not run yet and stays pending.
    StageStalled(LayoutStage),
    /// A data change was folded into an already scheduled refresh.
    RefreshCoalesced,
    /// A refresh task was handed to the scheduler.
    RefreshScheduled,
    /// The run stopped after too many passes.
    PassLimitReached,
}

#[derive(Debug, Clone)]
pub struct PipelineAuditEvent {
    pub timestamp: SystemTime,
    pub stage: PipelineAuditStage,
    pub details: Vec<(String, Value)>,
}

impl PipelineAuditEvent {
    fn new(stage: PipelineAuditStage) -> Self {
        Self {
            timestamp: SystemTime::now(),
            stage,
            details: Vec::new(),
        }
    }
}

pub struct PipelineAuditEventBuilder {
    event: PipelineAuditEvent,
}

impl PipelineAuditEventBuilder {
    pub fn new(stage: PipelineAuditStage) -> Self {
        Self {
            event: PipelineAuditEvent::new(stage),
        }
    }

    pub fn detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.event.details.push((key.into(), value));
        self
    }

    pub fn finish(self) -> PipelineAuditEvent {
        self.event
    }
}

pub trait PipelineAudit: Send + Sync {
    fn record(&self, event: PipelineAuditEvent);
}

#[derive(Debug, Default)]
pub struct NullPipelineAudit;

impl PipelineAudit for NullPipelineAudit {
    fn record(&self, _event: PipelineAuditEvent) {}
}

/// Buffers audit events; clones share the buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingAudit {
    events: Arc<Mutex<Vec<PipelineAuditEvent>>>,
}

impl RecordingAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stages(&self) -> Vec<PipelineAuditStage> {
        self.events
            .lock()
            .map(|guard| guard.iter().map(|event| event.stage).collect())
            .unwrap_or_default()
    }

    pub fn events(&self) -> Vec<PipelineAuditEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.events.lock() {
            guard.clear();
        }
    }
}

impl PipelineAudit for RecordingAudit {
    fn record(&self, event: PipelineAuditEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}
