//! Host surface boundary.
//!
//! The engine never builds or styles elements. It asks the host to measure,
//! show, hide and order the elements that back each command through
//! [`HostSurface`]. [`TerminalSurface`] is a reference host for a single-row
//! terminal command bar.

mod terminal;

pub use terminal::{TerminalElement, TerminalSurface, TerminalSurfaceSettings};

use crate::command::{Command, CommandId};

/// Element handle the engine passes to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementRef {
    /// The element backing a command in the action area.
    Command(CommandId),
    /// The affordance that opens the overflow area.
    OverflowIndicator,
}

/// Collaborator that owns the visual elements of the action area.
pub trait HostSurface {
    /// Whether the action area is attached and reports a non-zero content width.
    fn is_attached_and_sized(&self) -> bool;

    /// Total width of an element in its current visible state.
    fn measure_width(&self, element: ElementRef) -> u16;

    /// Usable content width of the action area.
    fn measure_container_content_width(&self) -> u16;

    fn is_visible(&self, element: ElementRef) -> bool;

    fn set_visible(&mut self, element: ElementRef, visible: bool);

    /// Make the action area's children exactly `elements`, in that order.
    fn append_in_order(&mut self, elements: &[CommandId]);

    /// Create or refresh the element backing `command`.
    fn sync_element(&mut self, _command: &Command) {}

    /// Drop the element of a command that left the command list.
    fn release_element(&mut self, _id: CommandId) {}

    /// Move a content command's element into the shared content flyout.
    fn host_content_in_flyout(&mut self, _id: CommandId) {}

    /// Return a content command's element from the flyout to its command.
    fn restore_content(&mut self, _id: CommandId) {}

    /// Whether another engine already drives this surface.
    fn control_attached(&self) -> bool {
        false
    }

    fn attach_control(&mut self) {}
}
