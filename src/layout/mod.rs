//! Layout pipeline building blocks.
//!
//! Each stage of the pipeline lives in its own module; the coordinator in
//! [`crate::runtime`] strings them together.

pub mod diff;
pub mod measure;
pub mod overflow;
pub mod projection;
pub mod stage;

pub use diff::{ChangeSet, ElementPartition, diff_elements};
pub use measure::{MeasurementCache, Measurer};
pub use overflow::{
    OverflowEntry, OverflowInput, OverflowSplit, ReservationPolicy, resolve_overflow,
    resolve_priorities,
};
pub use projection::{
    CommandProjector, ContentFlyout, DEFAULT_CONTENT_LABEL, FlyoutTarget, MenuItem, MenuItemKind,
    collapse_separators,
};
pub use stage::{LayoutStage, StageOutcome, StageTracker};
