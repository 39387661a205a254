//! Command model orchestrator.
//!
//! The ordered command collection and the per-command display attributes live
//! in the private `core` module; the layout pipeline only reads them.

mod core;

pub use core::{
    Command, CommandAction, CommandId, CommandKind, CommandList, CommandSection, CommandSet,
    DataChange, FlyoutRef,
};
