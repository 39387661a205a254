use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;
use std::time::Duration;

/// Counters accumulated by the layout coordinator.
#[derive(Debug, Default, Clone)]
pub struct LayoutMetrics {
    pipeline_runs: u64,
    stalls: u64,
    measurements: u64,
    layouts: u64,
    unchanged_layouts: u64,
    overflowed_commands: u64,
    coalesced_refreshes: u64,
}

impl LayoutMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_pipeline_run(&mut self) {
        self.pipeline_runs = self.pipeline_runs.saturating_add(1);
    }

    pub fn record_stall(&mut self) {
        self.stalls = self.stalls.saturating_add(1);
    }

    pub fn record_measurement(&mut self) {
        self.measurements = self.measurements.saturating_add(1);
    }

    pub fn record_layout(&mut self, overflowed: usize, changed: bool) {
        self.layouts = self.layouts.saturating_add(1);
        self.overflowed_commands = self.overflowed_commands.saturating_add(overflowed as u64);
        if !changed {
            self.unchanged_layouts = self.unchanged_layouts.saturating_add(1);
        }
    }

    pub fn record_coalesced_refresh(&mut self) {
        self.coalesced_refreshes = self.coalesced_refreshes.saturating_add(1);
    }

    pub fn snapshot(&self, uptime: Duration) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms: uptime.as_millis() as u64,
            pipeline_runs: self.pipeline_runs,
            stalls: self.stalls,
            measurements: self.measurements,
            layouts: self.layouts,
            unchanged_layouts: self.unchanged_layouts,
            overflowed_commands: self.overflowed_commands,
            coalesced_refreshes: self.coalesced_refreshes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub pipeline_runs: u64,
    pub stalls: u64,
    pub measurements: u64,
    pub layouts: u64,
    pub unchanged_layouts: u64,
    /// Sum of overflowed commands across layouts.
    pub overflowed_commands: u64,
    pub coalesced_refreshes: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "layout_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("uptime_ms".to_string(), json!(self.uptime_ms));
        map.insert("pipeline_runs".to_string(), json!(self.pipeline_runs));
        map.insert("stalls".to_string(), json!(self.stalls));
        map.insert("measurements".to_string(), json!(self.measurements));
        map.insert("layouts".to_string(), json!(self.layouts));
        map.insert(
            "unchanged_layouts".to_string(),
            json!(self.unchanged_layouts),
        );
        map.insert(
            "overflowed_commands".to_string(),
            json!(self.overflowed_commands),
        );
        map.insert(
            "coalesced_refreshes".to_string(),
            json!(self.coalesced_refreshes),
        );
        map
    }
}
