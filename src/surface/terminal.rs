use std::collections::HashMap;

use crate::command::{Command, CommandId, CommandKind};
use crate::error::Result;
use crate::width::cell_width;

use super::{ElementRef, HostSurface};

/// Cell metrics for the terminal command bar.
#[derive(Debug, Clone)]
pub struct TerminalSurfaceSettings {
    /// Width of every button, toggle and flyout cell, brackets included.
    pub command_width: u16,
    pub separator_glyph: String,
    pub indicator_glyph: String,
    /// Blank cells on each side of separators, content and the indicator.
    pub padding: u16,
}

impl Default for TerminalSurfaceSettings {
    fn default() -> Self {
        Self {
            command_width: 12,
            separator_glyph: "│".to_string(),
            indicator_glyph: "…".to_string(),
            padding: 1,
        }
    }
}

/// Element state the terminal host keeps per command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalElement {
    pub kind: CommandKind,
    pub label: String,
    pub selected: bool,
    pub disabled: bool,
    pub visible: bool,
    /// Content elements move into the content flyout while it is open.
    pub in_flyout: bool,
}

/// Reference [`HostSurface`] for a one-row terminal command bar.
#[derive(Debug, Clone, Default)]
pub struct TerminalSurface {
    settings: TerminalSurfaceSettings,
    width: u16,
    attached: bool,
    controlled: bool,
    elements: HashMap<CommandId, TerminalElement>,
    order: Vec<CommandId>,
    indicator_visible: bool,
}

impl TerminalSurface {
    pub fn new(settings: TerminalSurfaceSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn with_default() -> Self {
        Self::new(TerminalSurfaceSettings::default())
    }

    pub fn settings(&self) -> &TerminalSurfaceSettings {
        &self.settings
    }

    /// Attach with an explicit width, e.g. a pane narrower than the terminal.
    pub fn attach(&mut self, width: u16) {
        self.attached = true;
        self.width = width;
    }

    /// Attach using the current terminal width.
    pub fn attach_to_terminal(&mut self) -> Result<()> {
        let (width, _height) = crossterm::terminal::size()?;
        self.attach(width);
        Ok(())
    }

    pub fn detach(&mut self) {
        self.attached = false;
    }

    pub fn resize(&mut self, width: u16) {
        self.width = width;
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn element(&self, id: CommandId) -> Option<&TerminalElement> {
        self.elements.get(&id)
    }

    /// Action area children in order.
    pub fn order(&self) -> &[CommandId] {
        &self.order
    }

    pub fn indicator_visible(&self) -> bool {
        self.indicator_visible
    }

    /// Elements currently drawn in the action area, in order.
    pub fn visible_elements(&self) -> impl Iterator<Item = (CommandId, &TerminalElement)> {
        self.order.iter().filter_map(|id| {
            self.elements
                .get(id)
                .filter(|element| element.visible && !element.in_flyout)
                .map(|element| (*id, element))
        })
    }

    fn padded(&self, glyph: &str) -> u16 {
        cell_width(glyph).saturating_add(self.settings.padding.saturating_mul(2))
    }

    fn element_width(&self, element: &TerminalElement) -> u16 {
        match element.kind {
            CommandKind::Separator => self.padded(&self.settings.separator_glyph),
            CommandKind::Content => self.padded(&element.label),
            _ => self.settings.command_width,
        }
    }
}

impl HostSurface for TerminalSurface {
    fn is_attached_and_sized(&self) -> bool {
        self.attached && self.width > 0
    }

    fn measure_width(&self, element: ElementRef) -> u16 {
        match element {
            ElementRef::OverflowIndicator => {
                if self.indicator_visible {
                    self.padded(&self.settings.indicator_glyph)
                } else {
                    0
                }
            }
            ElementRef::Command(id) => self
                .elements
                .get(&id)
                .filter(|element| element.visible)
                .map(|element| self.element_width(element))
                .unwrap_or(0),
        }
    }

    fn measure_container_content_width(&self) -> u16 {
        if self.attached { self.width } else { 0 }
    }

    fn is_visible(&self, element: ElementRef) -> bool {
        match element {
            ElementRef::OverflowIndicator => self.indicator_visible,
            ElementRef::Command(id) => self
                .elements
                .get(&id)
                .map(|element| element.visible)
                .unwrap_or(false),
        }
    }

    fn set_visible(&mut self, element: ElementRef, visible: bool) {
        match element {
            ElementRef::OverflowIndicator => self.indicator_visible = visible,
            ElementRef::Command(id) => {
                if let Some(element) = self.elements.get_mut(&id) {
                    element.visible = visible;
                }
            }
        }
    }

    fn append_in_order(&mut self, elements: &[CommandId]) {
        self.order = elements.to_vec();
    }

    fn sync_element(&mut self, command: &Command) {
        let element = self
            .elements
            .entry(command.id())
            .or_insert_with(|| TerminalElement {
                kind: command.kind,
                label: String::new(),
                selected: false,
                disabled: false,
                visible: true,
                in_flyout: false,
            });
        element.kind = command.kind;
        element.label = command.label.clone();
        element.selected = command.selected;
        element.disabled = command.disabled;
    }

    fn release_element(&mut self, id: CommandId) {
        self.elements.remove(&id);
        self.order.retain(|existing| *existing != id);
    }

    fn host_content_in_flyout(&mut self, id: CommandId) {
        if let Some(element) = self.elements.get_mut(&id) {
            element.in_flyout = true;
        }
    }

    fn restore_content(&mut self, id: CommandId) {
        if let Some(element) = self.elements.get_mut(&id) {
            element.in_flyout = false;
        }
    }

    fn control_attached(&self) -> bool {
        self.controlled
    }

    fn attach_control(&mut self) {
        self.controlled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_elements_measure_zero() {
        let mut surface = TerminalSurface::with_default();
        let button = Command::button("Save");
        surface.sync_element(&button);
        let element = ElementRef::Command(button.id());
        assert_eq!(surface.measure_width(element), 12);

        surface.set_visible(element, false);
        assert_eq!(surface.measure_width(element), 0);
    }

    #[test]
    fn content_and_separator_widths_follow_glyphs() {
        let mut surface = TerminalSurface::with_default();
        let content = Command::content("\x1b[32mvolume\x1b[0m");
        let separator = Command::separator();
        surface.sync_element(&content);
        surface.sync_element(&separator);

        assert_eq!(surface.measure_width(ElementRef::Command(content.id())), 8);
        assert_eq!(surface.measure_width(ElementRef::Command(separator.id())), 3);
    }

    #[test]
    fn unattached_surface_is_not_sized() {
        let mut surface = TerminalSurface::with_default();
        assert!(!surface.is_attached_and_sized());
        surface.attach(0);
        assert!(!surface.is_attached_and_sized());
        surface.resize(40);
        assert!(surface.is_attached_and_sized());
        assert_eq!(surface.measure_container_content_width(), 40);
    }

    #[test]
    fn released_elements_leave_the_action_area() {
        let mut surface = TerminalSurface::with_default();
        let a = Command::button("a");
        let b = Command::button("b");
        surface.sync_element(&a);
        surface.sync_element(&b);
        surface.append_in_order(&[a.id(), b.id()]);
        surface.release_element(a.id());

        assert_eq!(surface.order(), &[b.id()]);
        assert!(surface.element(a.id()).is_none());
    }
}
