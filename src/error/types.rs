use thiserror::Error;

use crate::command::CommandId;

/// Unified result type for the command bar engine.
pub type Result<T> = std::result::Result<T, LayoutError>;

/// Errors surfaced to callers of the layout engine.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("command {0} is already part of the command list")]
    DuplicateCommand(CommandId),
    #[error("command {0} not found")]
    CommandNotFound(CommandId),
    #[error("index {index} out of range for {len} commands")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("overflow menu has no item at index {0}")]
    MenuItemNotFound(usize),
    #[error("host surface is already driven by a layout engine")]
    DuplicateControl,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
