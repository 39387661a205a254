use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::error::{LayoutError, Result};

static NEXT_COMMAND_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a command instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CommandId(u64);

impl CommandId {
    fn next() -> Self {
        Self(NEXT_COMMAND_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which surface a command belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandSection {
    Primary,
    Secondary,
}

/// Shape of a command; drives measurement bucketing and menu projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Button,
    Toggle,
    Flyout,
    Content,
    Separator,
}

impl CommandKind {
    /// Buttons, toggles and flyouts share one measured width.
    pub fn is_standard(self) -> bool {
        matches!(self, Self::Button | Self::Toggle | Self::Flyout)
    }
}

/// Opaque reference to a host-owned flyout.
pub type FlyoutRef = String;

/// Callback fired when a command (or its menu projection) is invoked.
pub type CommandAction = Arc<dyn Fn(CommandId) + Send + Sync>;

/// One logical action shown in the action area or the overflow menu.
#[derive(Clone)]
pub struct Command {
    id: CommandId,
    pub section: CommandSection,
    pub kind: CommandKind,
    pub priority: Option<i32>,
    pub hidden: bool,
    pub disabled: bool,
    pub selected: bool,
    pub label: String,
    pub extra_class: Option<String>,
    pub flyout: Option<FlyoutRef>,
    pub on_invoke: Option<CommandAction>,
}

impl Command {
    pub fn new(kind: CommandKind) -> Self {
        Self {
            id: CommandId::next(),
            section: CommandSection::Primary,
            kind,
            priority: None,
            hidden: false,
            disabled: false,
            selected: false,
            label: String::new(),
            extra_class: None,
            flyout: None,
            on_invoke: None,
        }
    }

    pub fn button(label: impl Into<String>) -> Self {
        Self::new(CommandKind::Button).with_label(label)
    }

    pub fn toggle(label: impl Into<String>) -> Self {
        Self::new(CommandKind::Toggle).with_label(label)
    }

    pub fn flyout(label: impl Into<String>, flyout: impl Into<FlyoutRef>) -> Self {
        let mut command = Self::new(CommandKind::Flyout).with_label(label);
        command.flyout = Some(flyout.into());
        command
    }

    pub fn content(label: impl Into<String>) -> Self {
        Self::new(CommandKind::Content).with_label(label)
    }

    pub fn separator() -> Self {
        Self::new(CommandKind::Separator)
    }

    pub fn id(&self) -> CommandId {
        self.id
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn secondary(mut self) -> Self {
        self.section = CommandSection::Secondary;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    pub fn with_extra_class(mut self, class: impl Into<String>) -> Self {
        self.extra_class = Some(class.into());
        self
    }

    pub fn on_invoke<F>(mut self, action: F) -> Self
    where
        F: Fn(CommandId) + Send + Sync + 'static,
    {
        self.on_invoke = Some(Arc::new(action));
        self
    }

    pub fn is_primary(&self) -> bool {
        self.section == CommandSection::Primary
    }

    /// Fields whose change requires the command set to be rebuilt and remeasured.
    pub(crate) fn structure_differs(&self, other: &Command) -> bool {
        self.section != other.section
            || self.kind != other.kind
            || self.priority != other.priority
            || self.hidden != other.hidden
            || self.label != other.label
    }

    pub(crate) fn presentation_differs(&self, other: &Command) -> bool {
        let same_action = match (&self.on_invoke, &other.on_invoke) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        self.disabled != other.disabled
            || self.selected != other.selected
            || self.flyout != other.flyout
            || self.extra_class != other.extra_class
            || !same_action
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("section", &self.section)
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field("hidden", &self.hidden)
            .field("disabled", &self.disabled)
            .field("selected", &self.selected)
            .field("label", &self.label)
            .field("extra_class", &self.extra_class)
            .field("flyout", &self.flyout)
            .field("on_invoke", &self.on_invoke.is_some())
            .finish()
    }
}

/// Kind of mutation a host reports on the command collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DataChange {
    Insert { index: usize },
    Remove { index: usize },
    Move { from: usize, to: usize },
    Reload,
    Update { id: CommandId },
}

/// Ordered command collection owned by the coordinator on the host's behalf.
#[derive(Debug, Clone, Default)]
pub struct CommandList {
    commands: Vec<Command>,
}

impl CommandList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_commands(commands: Vec<Command>) -> Result<Self> {
        let mut list = Self::new();
        for command in commands {
            list.push(command)?;
        }
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    pub fn get(&self, id: CommandId) -> Option<&Command> {
        self.commands.iter().find(|command| command.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: CommandId) -> Option<&mut Command> {
        self.commands.iter_mut().find(|command| command.id == id)
    }

    pub fn position(&self, id: CommandId) -> Option<usize> {
        self.commands.iter().position(|command| command.id == id)
    }

    pub fn contains(&self, id: CommandId) -> bool {
        self.position(id).is_some()
    }

    pub fn push(&mut self, command: Command) -> Result<DataChange> {
        let index = self.commands.len();
        self.insert(index, command)
    }

    pub fn insert(&mut self, index: usize, command: Command) -> Result<DataChange> {
        if index > self.commands.len() {
            return Err(LayoutError::IndexOutOfRange {
                index,
                len: self.commands.len(),
            });
        }
        if self.contains(command.id) {
            return Err(LayoutError::DuplicateCommand(command.id));
        }
        self.commands.insert(index, command);
        Ok(DataChange::Insert { index })
    }

    pub fn remove(&mut self, id: CommandId) -> Result<(Command, DataChange)> {
        let index = self
            .position(id)
            .ok_or(LayoutError::CommandNotFound(id))?;
        let command = self.commands.remove(index);
        Ok((command, DataChange::Remove { index }))
    }

    pub fn move_to(&mut self, id: CommandId, to: usize) -> Result<DataChange> {
        let from = self
            .position(id)
            .ok_or(LayoutError::CommandNotFound(id))?;
        if to >= self.commands.len() {
            return Err(LayoutError::IndexOutOfRange {
                index: to,
                len: self.commands.len(),
            });
        }
        let command = self.commands.remove(from);
        self.commands.insert(to, command);
        Ok(DataChange::Move { from, to })
    }

    /// Replace the whole collection. Nothing changes if the new set is invalid.
    pub fn reload(&mut self, commands: Vec<Command>) -> Result<DataChange> {
        *self = Self::from_commands(commands)?;
        Ok(DataChange::Reload)
    }

    /// Split into primary and secondary ids, each in declared order.
    pub fn command_set(&self) -> CommandSet {
        let mut set = CommandSet::default();
        for command in &self.commands {
            match command.section {
                CommandSection::Primary => set.primary.push(command.id),
                CommandSection::Secondary => set.secondary.push(command.id),
            }
        }
        set
    }
}

/// Primary/secondary partition derived from a [`CommandList`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSet {
    pub primary: Vec<CommandId>,
    pub secondary: Vec<CommandId>,
}

impl CommandSet {
    pub fn has_secondary(&self) -> bool {
        !self.secondary.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_per_instance() {
        let a = Command::button("a");
        let b = Command::button("a");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let command = Command::button("save");
        let mut list = CommandList::new();
        list.push(command.clone()).unwrap();
        let err = list.push(command).unwrap_err();
        assert!(matches!(err, LayoutError::DuplicateCommand(_)));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn move_and_remove_report_indices() {
        let a = Command::button("a");
        let b = Command::button("b");
        let c = Command::button("c");
        let (a_id, c_id) = (a.id(), c.id());
        let mut list = CommandList::from_commands(vec![a, b, c]).unwrap();

        let change = list.move_to(c_id, 0).unwrap();
        assert_eq!(change, DataChange::Move { from: 2, to: 0 });
        assert_eq!(list.position(c_id), Some(0));

        let (removed, change) = list.remove(a_id).unwrap();
        assert_eq!(removed.id(), a_id);
        assert_eq!(change, DataChange::Remove { index: 1 });
        assert!(matches!(
            list.move_to(c_id, 5),
            Err(LayoutError::IndexOutOfRange { index: 5, len: 2 })
        ));
    }

    #[test]
    fn reload_keeps_previous_state_on_error() {
        let a = Command::button("a");
        let mut list = CommandList::from_commands(vec![a.clone()]).unwrap();
        let err = list.reload(vec![a.clone(), a]).unwrap_err();
        assert!(matches!(err, LayoutError::DuplicateCommand(_)));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn command_set_splits_sections_in_order() {
        let p1 = Command::button("p1");
        let s1 = Command::button("s1").secondary();
        let p2 = Command::separator();
        let s2 = Command::toggle("s2").secondary();
        let ids = [p1.id(), s1.id(), p2.id(), s2.id()];
        let list = CommandList::from_commands(vec![p1, s1, p2, s2]).unwrap();

        let set = list.command_set();
        assert_eq!(set.primary, vec![ids[0], ids[2]]);
        assert_eq!(set.secondary, vec![ids[1], ids[3]]);
        assert!(set.has_secondary());
    }

    #[test]
    fn change_classification() {
        let base = Command::button("a");
        let mut relabeled = base.clone();
        relabeled.label = "b".into();
        assert!(base.structure_differs(&relabeled));
        assert!(!base.presentation_differs(&relabeled));

        let mut toggled = base.clone();
        toggled.selected = true;
        assert!(!base.structure_differs(&toggled));
        assert!(base.presentation_differs(&toggled));
    }
}
