//! Classification of element changes between two renders.
//!
//! The result feeds an animation collaborator; nothing here animates.

use std::collections::HashSet;

use serde::Serialize;

use crate::command::CommandId;

/// Elements of one render, split by whether they are displayed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementPartition {
    pub visible: Vec<CommandId>,
    /// Present in the sequence but currently not displayed.
    pub hidden: Vec<CommandId>,
}

/// Added, deleted and merely reordered elements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub added: Vec<CommandId>,
    pub deleted: Vec<CommandId>,
    pub affected: Vec<CommandId>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty() && self.affected.is_empty()
    }
}

/// Compare the rendered partition against the desired one.
///
/// Hidden elements of `next` always count as added so elements coming back
/// from the overflow area still get an entrance.
pub fn diff_elements(current: &ElementPartition, next: &ElementPartition) -> ChangeSet {
    let current_visible: HashSet<CommandId> = current.visible.iter().copied().collect();
    let next_visible: HashSet<CommandId> = next.visible.iter().copied().collect();

    let mut changes = ChangeSet::default();
    for id in &current.visible {
        if next_visible.contains(id) {
            changes.affected.push(*id);
        } else {
            changes.deleted.push(*id);
        }
    }

    let mut added: HashSet<CommandId> = HashSet::new();
    for id in &next.visible {
        if !current_visible.contains(id) && added.insert(*id) {
            changes.added.push(*id);
        }
    }
    for id in &next.hidden {
        if added.insert(*id) {
            changes.added.push(*id);
        }
    }
    changes
}
