//! Error module orchestrator.
//!
//! Configuration failures surface through [`LayoutError`]; transient host
//! unavailability never does, it stalls the pipeline instead.

mod types;

pub use types::{LayoutError, Result};
