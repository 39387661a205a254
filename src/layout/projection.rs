//! Projection of overflowing and secondary commands into overflow menu items.

use std::fmt;

use serde::Serialize;

use crate::command::{Command, CommandAction, CommandId, CommandKind, FlyoutRef};
use crate::surface::HostSurface;

/// Label given to projected content commands that carry none.
pub const DEFAULT_CONTENT_LABEL: &str = "Custom content";

/// Shape of a menu item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuItemKind {
    Button,
    Toggle,
    Flyout,
    Separator,
}

/// What a flyout menu item opens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "target", content = "value", rename_all = "snake_case")]
pub enum FlyoutTarget {
    External(FlyoutRef),
    /// The shared flyout that hosts a content command's element.
    SharedContent(CommandId),
}

/// One entry of the overflow menu.
#[derive(Clone, Serialize)]
pub struct MenuItem {
    pub kind: MenuItemKind,
    pub label: String,
    pub extra_class: Option<String>,
    pub flyout: Option<FlyoutTarget>,
    pub disabled: bool,
    pub selected: bool,
    /// Command mirrored by this item; `None` for synthesized separators.
    pub source: Option<CommandId>,
    #[serde(skip)]
    pub on_invoke: Option<CommandAction>,
}

impl MenuItem {
    pub fn separator() -> Self {
        Self {
            kind: MenuItemKind::Separator,
            label: String::new(),
            extra_class: None,
            flyout: None,
            disabled: false,
            selected: false,
            source: None,
            on_invoke: None,
        }
    }

    pub fn is_separator(&self) -> bool {
        self.kind == MenuItemKind::Separator
    }
}

impl fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuItem")
            .field("kind", &self.kind)
            .field("label", &self.label)
            .field("extra_class", &self.extra_class)
            .field("flyout", &self.flyout)
            .field("disabled", &self.disabled)
            .field("selected", &self.selected)
            .field("source", &self.source)
            .finish()
    }
}

impl PartialEq for MenuItem {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.label == other.label
            && self.extra_class == other.extra_class
            && self.flyout == other.flyout
            && self.disabled == other.disabled
            && self.selected == other.selected
            && self.source == other.source
    }
}

/// Builds the overflow menu from overflowing primary and secondary commands.
#[derive(Debug, Clone)]
pub struct CommandProjector {
    content_label: String,
}

impl Default for CommandProjector {
    fn default() -> Self {
        Self::new(DEFAULT_CONTENT_LABEL)
    }
}

impl CommandProjector {
    pub fn new(content_label: impl Into<String>) -> Self {
        Self {
            content_label: content_label.into(),
        }
    }

    /// Project `overflowing` primary commands followed by the non-hidden
    /// `secondary` commands, then collapse redundant separators.
    pub fn project<'a, P, S>(&self, overflowing: P, secondary: S) -> Vec<MenuItem>
    where
        P: IntoIterator<Item = &'a Command>,
        S: IntoIterator<Item = &'a Command>,
    {
        let mut items: Vec<MenuItem> = overflowing
            .into_iter()
            .filter(|command| !command.hidden)
            .map(|command| self.project_command(command))
            .collect();

        let secondary: Vec<MenuItem> = secondary
            .into_iter()
            .filter(|command| !command.hidden)
            .map(|command| self.project_command(command))
            .collect();

        if !items.is_empty() && !secondary.is_empty() {
            items.push(MenuItem::separator());
        }
        items.extend(secondary);
        collapse_separators(items)
    }

    pub fn project_command(&self, command: &Command) -> MenuItem {
        let mut item = MenuItem {
            kind: MenuItemKind::Button,
            label: command.label.clone(),
            extra_class: command.extra_class.clone(),
            flyout: None,
            disabled: command.disabled,
            selected: command.selected,
            source: Some(command.id()),
            on_invoke: None,
        };

        match command.kind {
            CommandKind::Content => {
                item.kind = MenuItemKind::Flyout;
                item.flyout = Some(FlyoutTarget::SharedContent(command.id()));
                if item.label.is_empty() {
                    item.label = self.content_label.clone();
                }
            }
            CommandKind::Flyout => {
                item.kind = MenuItemKind::Flyout;
                item.flyout = command.flyout.clone().map(FlyoutTarget::External);
                item.on_invoke = command.on_invoke.clone();
            }
            CommandKind::Toggle => {
                item.kind = MenuItemKind::Toggle;
                item.on_invoke = command.on_invoke.clone();
            }
            CommandKind::Separator => {
                item.kind = MenuItemKind::Separator;
            }
            CommandKind::Button => {
                item.on_invoke = command.on_invoke.clone();
            }
        }
        item
    }
}

/// Drop leading separators, repeated separators and trailing separators.
pub fn collapse_separators(items: Vec<MenuItem>) -> Vec<MenuItem> {
    let mut collapsed: Vec<MenuItem> = Vec::with_capacity(items.len());
    for item in items {
        if item.is_separator() {
            let after_content = collapsed.last().is_some_and(|last| !last.is_separator());
            if !after_content {
                continue;
            }
        }
        collapsed.push(item);
    }
    if collapsed.last().is_some_and(MenuItem::is_separator) {
        collapsed.pop();
    }
    collapsed
}

/// The flyout shared by every projected content command.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ContentFlyout {
    hosted: Option<CommandId>,
}

impl ContentFlyout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hosted(&self) -> Option<CommandId> {
        self.hosted
    }

    pub fn is_open(&self) -> bool {
        self.hosted.is_some()
    }

    /// Move the content of `id` into the flyout, returning any previous guest first.
    pub fn show<S>(&mut self, surface: &mut S, id: CommandId)
    where
        S: HostSurface + ?Sized,
    {
        if self.hosted == Some(id) {
            return;
        }
        self.hide(surface);
        surface.host_content_in_flyout(id);
        self.hosted = Some(id);
    }

    pub fn hide<S>(&mut self, surface: &mut S) -> Option<CommandId>
    where
        S: HostSurface + ?Sized,
    {
        let hosted = self.hosted.take()?;
        surface.restore_content(hosted);
        Some(hosted)
    }
}
