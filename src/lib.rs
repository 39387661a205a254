//! Adaptive command-bar layout engine.
//!
//! Commands are split between a width-limited action area and an overflow
//! menu by priority. The host owns the elements and answers measurement
//! queries through [`HostSurface`]; [`CommandLayout`] drives the staged
//! pipeline (new data, measuring, layout) on top of it.

pub mod command;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod logging;
pub mod metrics;
pub mod render;
pub mod runtime;
pub mod surface;
pub mod width;

pub use command::{
    Command, CommandAction, CommandId, CommandKind, CommandList, CommandSection, CommandSet,
    DataChange, FlyoutRef,
};
pub use error::{LayoutError, Result};
pub use geometry::Rect;
pub use layout::{
    ChangeSet, CommandProjector, ContentFlyout, ElementPartition, FlyoutTarget, LayoutStage,
    MeasurementCache, Measurer, MenuItem, MenuItemKind, OverflowEntry, OverflowInput,
    OverflowSplit, ReservationPolicy, StageOutcome, StageTracker, diff_elements, resolve_overflow,
    resolve_priorities,
};
pub use logging::{LogEvent, LogFields, LogLevel, Logger, LoggingError, LoggingResult};
pub use metrics::{LayoutMetrics, MetricSnapshot};
pub use render::{AnsiRenderer, RendererSettings};
pub use runtime::audit::{
    NullPipelineAudit, PipelineAudit, PipelineAuditEvent, PipelineAuditEventBuilder,
    PipelineAuditStage, RecordingAudit,
};
pub use runtime::diagnostics::{LifecycleLoggerObserver, MetricsSnapshotObserver};
pub use runtime::scheduler::{ManualScheduler, RefreshTask, TaskScheduler};
pub use runtime::{
    CommandLayout, LayoutConfig, LayoutContext, LayoutObserver, LayoutSnapshot, MenuInvocation,
};
pub use surface::{ElementRef, HostSurface, TerminalElement, TerminalSurface, TerminalSurfaceSettings};
pub use width::display_width;
