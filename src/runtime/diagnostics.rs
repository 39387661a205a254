use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::json;

use crate::layout::ChangeSet;
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};
use crate::metrics::LayoutMetrics;

use super::{LayoutContext, LayoutObserver, LayoutSnapshot};

/// Logs every layout pass and element classification.
pub struct LifecycleLoggerObserver {
    logger: Logger,
    level: LogLevel,
    log_before: bool,
    log_changes: bool,
}

impl LifecycleLoggerObserver {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            level: LogLevel::Debug,
            log_before: false,
            log_changes: true,
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn log_before(mut self, enabled: bool) -> Self {
        self.log_before = enabled;
        self
    }

    pub fn log_changes(mut self, enabled: bool) -> Self {
        self.log_changes = enabled;
        self
    }

    fn emit(&self, message: &str, fields: impl IntoIterator<Item = (String, serde_json::Value)>) {
        let event = event_with_fields(self.level, "cmdbar::layout.lifecycle", message, fields);
        let _ = self.logger.log_event(event);
    }
}

impl LayoutObserver for LifecycleLoggerObserver {
    fn name(&self) -> &str {
        "diagnostics.lifecycle_logger"
    }

    fn before_layout(&mut self, ctx: &mut LayoutContext<'_>) {
        if self.log_before {
            self.emit(
                "layout.before",
                [json_kv("commands", json!(ctx.commands().len()))],
            );
        }
    }

    fn after_layout(&mut self, _ctx: &mut LayoutContext<'_>, snapshot: &LayoutSnapshot) {
        self.emit(
            "layout.after",
            [
                json_kv("available_width", json!(snapshot.available_width)),
                json_kv("visible", json!(snapshot.split.action_area.len())),
                json_kv("overflowed", json!(snapshot.split.overflow_area.len())),
                json_kv("menu_items", json!(snapshot.menu.len())),
                json_kv("threshold", json!(snapshot.split.overflow_threshold)),
            ],
        );
    }

    fn on_changes(&mut self, _ctx: &mut LayoutContext<'_>, changes: &ChangeSet) {
        if !self.log_changes || changes.is_empty() {
            return;
        }
        self.emit(
            "layout.changes",
            [
                json_kv("added", json!(changes.added.len())),
                json_kv("deleted", json!(changes.deleted.len())),
                json_kv("affected", json!(changes.affected.len())),
            ],
        );
    }
}

/// Emits layout metrics snapshots after layouts, at most once per interval.
pub struct MetricsSnapshotObserver {
    logger: Logger,
    metrics: Arc<Mutex<LayoutMetrics>>,
    target: String,
    interval: Duration,
    last_emit: Option<Instant>,
    started_at: Instant,
}

impl MetricsSnapshotObserver {
    pub fn new(logger: Logger, metrics: Arc<Mutex<LayoutMetrics>>) -> Self {
        Self {
            logger,
            metrics,
            target: "cmdbar::layout.metrics".to_string(),
            interval: Duration::from_secs(5),
            last_emit: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    fn emit_snapshot(&mut self) {
        if self.interval == Duration::from_millis(0) {
            return;
        }

        let now = Instant::now();
        if let Some(last) = self.last_emit {
            if now.duration_since(last) < self.interval {
                return;
            }
        }

        self.last_emit = Some(now);
        let uptime = now.duration_since(self.started_at);

        if let Ok(guard) = self.metrics.lock() {
            let event = guard.snapshot(uptime).to_log_event(&self.target);
            let _ = self.logger.log_event(event);
        }
    }
}

impl LayoutObserver for MetricsSnapshotObserver {
    fn name(&self) -> &str {
        "diagnostics.metrics_snapshot"
    }

    fn after_layout(&mut self, _ctx: &mut LayoutContext<'_>, _snapshot: &LayoutSnapshot) {
        self.emit_snapshot();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::logging::MemorySink;
    use crate::runtime::{CommandLayout, LayoutConfig};
    use crate::surface::TerminalSurface;

    fn bar(width: u16) -> TerminalSurface {
        let mut surface = TerminalSurface::with_default();
        surface.attach(width);
        surface
    }

    #[test]
    fn lifecycle_logger_reports_layouts_and_changes() {
        let sink = MemorySink::new();
        let mut layout =
            CommandLayout::new(bar(40), vec![Command::button("a"), Command::button("b")]).unwrap();
        layout.register_observer(LifecycleLoggerObserver::new(Logger::new(sink.clone())));
        layout.force_layout();

        let messages = sink.messages();
        assert!(messages.contains(&"layout.changes".to_string()));
        assert!(messages.contains(&"layout.after".to_string()));

        let after = sink
            .events()
            .into_iter()
            .find(|event| event.message == "layout.after")
            .unwrap();
        assert_eq!(after.field("visible"), Some(&json!(2)));
        assert_eq!(after.target, "cmdbar::layout.lifecycle");
    }

    #[test]
    fn metrics_snapshot_respects_interval() {
        let sink = MemorySink::new();
        let mut config = LayoutConfig::default();
        config.enable_metrics();
        let metrics = config.metrics_handle().unwrap();
        let mut layout =
            CommandLayout::with_config(bar(40), vec![Command::button("a")], config).unwrap();
        layout.register_observer(
            MetricsSnapshotObserver::new(Logger::new(sink.clone()), metrics)
                .with_interval(Duration::from_secs(3600)),
        );

        layout.force_layout();
        layout.force_layout();

        let snapshots = sink
            .events()
            .into_iter()
            .filter(|event| event.message == "layout_metrics")
            .count();
        assert_eq!(snapshots, 1);
    }
}
