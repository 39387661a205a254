use std::io::Write;

use crate::command::CommandKind;
use crate::error::Result;
use crate::geometry::Rect;
use crate::layout::{MenuItem, MenuItemKind};
use crate::surface::{ElementRef, HostSurface, TerminalElement, TerminalSurface};
use crate::width::{display_width, fit_to_width};

const RESET: &str = "\x1b[0m";

/// Renderer runtime parameters.
#[derive(Debug, Clone)]
pub struct RendererSettings {
    pub restore_cursor: Option<(u16, u16)>,
    /// Escape sequence wrapped around selected toggles.
    pub selected_style: String,
    pub disabled_style: String,
    pub menu_separator: char,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            restore_cursor: None,
            selected_style: "\x1b[7m".to_string(),
            disabled_style: "\x1b[2m".to_string(),
            menu_separator: '─',
        }
    }
}

/// ANSI escape code renderer for the terminal command bar.
pub struct AnsiRenderer {
    settings: RendererSettings,
}

impl AnsiRenderer {
    pub fn new(settings: RendererSettings) -> Self {
        Self { settings }
    }

    pub fn with_default() -> Self {
        Self::new(RendererSettings::default())
    }

    pub fn settings_mut(&mut self) -> &mut RendererSettings {
        &mut self.settings
    }

    /// Draw the action row of `surface` on the first line of `area`, with the
    /// overflow indicator right-aligned.
    pub fn render_bar(
        &mut self,
        writer: &mut impl Write,
        area: Rect,
        surface: &TerminalSurface,
    ) -> Result<()> {
        if area.width == 0 || area.height == 0 {
            return Ok(());
        }

        let indicator_width = surface
            .measure_width(ElementRef::OverflowIndicator)
            .min(area.width);
        let row_width = area.width - indicator_width;

        let mut line = String::new();
        let mut used = 0u16;
        for (id, element) in surface.visible_elements() {
            let width = surface.measure_width(ElementRef::Command(id));
            if used.saturating_add(width) > row_width {
                break;
            }
            line.push_str(&self.element_cell(surface, element, width));
            used += width;
        }
        line.push_str(&" ".repeat(usize::from(row_width - used)));

        write!(writer, "\x1b[{};{}H{}", area.y + 1, area.x + 1, line)?;
        if indicator_width > 0 {
            let column = area.right() - indicator_width;
            let glyph = padded(
                &surface.settings().indicator_glyph,
                surface.settings().padding,
                indicator_width,
            );
            write!(writer, "\x1b[{};{}H{}", area.y + 1, column + 1, glyph)?;
        }

        self.finish(writer)
    }

    /// Draw the overflow menu, one item per line, clipped to `area`.
    pub fn render_menu(
        &mut self,
        writer: &mut impl Write,
        area: Rect,
        items: &[MenuItem],
    ) -> Result<()> {
        if area.width == 0 {
            return Ok(());
        }

        for (row, item) in (area.y..area.bottom()).zip(items) {
            let text = if item.is_separator() {
                self.settings
                    .menu_separator
                    .to_string()
                    .repeat(usize::from(area.width))
            } else {
                self.styled(
                    fit_to_width(&menu_label(item), area.width),
                    item.selected && item.kind == MenuItemKind::Toggle,
                    item.disabled,
                )
            };
            write!(writer, "\x1b[{};{}H{}", row + 1, area.x + 1, text)?;
        }

        self.finish(writer)
    }

    fn element_cell(&self, surface: &TerminalSurface, element: &TerminalElement, width: u16) -> String {
        let settings = surface.settings();
        match element.kind {
            CommandKind::Separator => padded(&settings.separator_glyph, settings.padding, width),
            CommandKind::Content => padded(&element.label, settings.padding, width),
            CommandKind::Flyout => self.styled(
                fit_to_width(&format!("[{}▾]", element.label), width),
                false,
                element.disabled,
            ),
            CommandKind::Toggle | CommandKind::Button => self.styled(
                fit_to_width(&format!("[{}]", element.label), width),
                element.selected,
                element.disabled,
            ),
        }
    }

    fn styled(&self, text: String, selected: bool, disabled: bool) -> String {
        let mut prefix = String::new();
        if selected {
            prefix.push_str(&self.settings.selected_style);
        }
        if disabled {
            prefix.push_str(&self.settings.disabled_style);
        }
        if prefix.is_empty() {
            text
        } else {
            format!("{prefix}{text}{RESET}")
        }
    }

    fn finish(&self, writer: &mut impl Write) -> Result<()> {
        if let Some((row, col)) = self.settings.restore_cursor {
            write!(writer, "\x1b[{};{}H", row + 1, col + 1)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn menu_label(item: &MenuItem) -> String {
    match item.kind {
        MenuItemKind::Toggle => {
            let mark = if item.selected { 'x' } else { ' ' };
            format!("[{mark}] {}", item.label)
        }
        MenuItemKind::Flyout => format!("{} ›", item.label),
        MenuItemKind::Button | MenuItemKind::Separator => item.label.clone(),
    }
}

/// Left padding, `text` kept verbatim (it may carry styling), then blanks up to `width`.
fn padded(text: &str, padding: u16, width: u16) -> String {
    let used = usize::from(padding) + display_width(text);
    let fill = usize::from(width).saturating_sub(used);
    format!("{}{}{}", " ".repeat(usize::from(padding)), text, " ".repeat(fill))
}
