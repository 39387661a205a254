//! Priority-driven overflow resolution.
//!
//! Primary commands are walked in ascending priority, consuming width until
//! one no longer fits next to the overflow indicator. Everything from that
//! priority upward overflows; the two partitions keep declared order.

use serde::Serialize;

use crate::command::{Command, CommandId};

/// How the indicator reservation decides whether secondary commands exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationPolicy {
    /// Any secondary command counts, hidden or not.
    #[default]
    Compatible,
    /// Only non-hidden secondary commands count.
    VisibleSecondary,
}

/// A non-hidden primary command as seen by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverflowEntry {
    pub id: CommandId,
    pub priority: i32,
    pub width: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct OverflowInput<'a> {
    /// Entries in declared order.
    pub entries: &'a [OverflowEntry],
    pub available_width: u16,
    pub indicator_width: u16,
    pub has_secondary: bool,
}

/// Partition of the primary commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OverflowSplit {
    pub action_area: Vec<CommandId>,
    pub overflow_area: Vec<CommandId>,
    /// Lowest priority that overflowed; `None` when everything fits.
    pub overflow_threshold: Option<i32>,
}

impl OverflowSplit {
    /// Highest priority kept in the action area, `None` when unbounded.
    pub fn max_visible_priority(&self) -> Option<i32> {
        self.overflow_threshold
            .map(|threshold| threshold.saturating_sub(1))
    }

    pub fn is_overflowing(&self) -> bool {
        !self.overflow_area.is_empty()
    }

    pub fn contains(&self, id: CommandId) -> bool {
        self.action_area.contains(&id) || self.overflow_area.contains(&id)
    }
}

/// Resolve priorities for the primary commands, in declared order.
///
/// Unset priorities are handed out walking the list backwards from `0`
/// downwards, so among unset commands the last declared overflows first.
pub fn resolve_priorities<'a, I>(primary: I) -> Vec<i32>
where
    I: IntoIterator<Item = &'a Command>,
    I::IntoIter: DoubleEndedIterator,
{
    let mut next_assigned = 0i32;
    let mut priorities: Vec<i32> = primary
        .into_iter()
        .rev()
        .map(|command| match command.priority {
            Some(priority) => priority,
            None => {
                let assigned = next_assigned;
                next_assigned = next_assigned.saturating_sub(1);
                assigned
            }
        })
        .collect();
    priorities.reverse();
    priorities
}

pub fn resolve_overflow(input: OverflowInput<'_>) -> OverflowSplit {
    let overflow_threshold = overflow_threshold(&input);

    let mut split = OverflowSplit {
        overflow_threshold,
        ..OverflowSplit::default()
    };
    for entry in input.entries {
        let visible = overflow_threshold.is_none_or(|threshold| entry.priority < threshold);
        if visible {
            split.action_area.push(entry.id);
        } else {
            split.overflow_area.push(entry.id);
        }
    }
    split
}

fn overflow_threshold(input: &OverflowInput<'_>) -> Option<i32> {
    let mut sorted: Vec<&OverflowEntry> = input.entries.iter().collect();
    // Stable: equal priorities keep declared order.
    sorted.sort_by_key(|entry| entry.priority);

    let indicator = i32::from(input.indicator_width);
    let last = sorted.len().saturating_sub(1);
    let mut remaining = i32::from(input.available_width);

    for (index, entry) in sorted.iter().enumerate() {
        remaining -= i32::from(entry.width);
        let reservation = if index == last && !input.has_secondary {
            0
        } else {
            indicator
        };
        if remaining - reservation < 0 {
            return Some(entry.priority);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(widths: &[u16], priorities: &[i32]) -> (Vec<Command>, Vec<OverflowEntry>) {
        let commands: Vec<Command> = widths.iter().map(|_| Command::button("cmd")).collect();
        let entries = commands
            .iter()
            .zip(widths.iter().zip(priorities))
            .map(|(command, (width, priority))| OverflowEntry {
                id: command.id(),
                priority: *priority,
                width: *width,
            })
            .collect();
        (commands, entries)
    }

    fn ids(commands: &[Command], indices: &[usize]) -> Vec<CommandId> {
        indices.iter().map(|idx| commands[*idx].id()).collect()
    }

    #[test]
    fn unset_priorities_count_down_from_the_end() {
        let commands = vec![
            Command::button("a"),
            Command::button("b").with_priority(7),
            Command::button("c"),
            Command::button("d"),
        ];
        assert_eq!(resolve_priorities(&commands), vec![-2, 7, -1, 0]);
    }

    #[test]
    fn five_commands_in_one_hundred_eighty_cells() {
        let commands: Vec<Command> = (0..5).map(|_| Command::button("cmd")).collect();
        let priorities = resolve_priorities(&commands);
        let entries: Vec<OverflowEntry> = commands
            .iter()
            .zip(priorities)
            .map(|(command, priority)| OverflowEntry {
                id: command.id(),
                priority,
                width: 50,
            })
            .collect();

        let split = resolve_overflow(OverflowInput {
            entries: &entries,
            available_width: 180,
            indicator_width: 20,
            has_secondary: false,
        });
        assert_eq!(split.action_area, ids(&commands, &[0, 1, 2]));
        assert_eq!(split.overflow_area, ids(&commands, &[3, 4]));
        assert_eq!(split.overflow_threshold, Some(-1));
        assert_eq!(split.max_visible_priority(), Some(-2));
    }

    #[test]
    fn last_command_skips_indicator_without_secondary() {
        let (commands, entries) = entries(&[50, 50], &[0, 1]);
        let input = OverflowInput {
            entries: &entries,
            available_width: 100,
            indicator_width: 20,
            has_secondary: false,
        };
        let split = resolve_overflow(input);
        assert_eq!(split.action_area, ids(&commands, &[0, 1]));
        assert_eq!(split.max_visible_priority(), None);

        let split = resolve_overflow(OverflowInput {
            has_secondary: true,
            ..input
        });
        assert_eq!(split.action_area, ids(&commands, &[0]));
        assert_eq!(split.overflow_area, ids(&commands, &[1]));
    }

    #[test]
    fn overflow_follows_priority_not_position() {
        let (commands, entries) = entries(&[30, 30, 30, 30], &[4, 1, 3, 2]);
        let split = resolve_overflow(OverflowInput {
            entries: &entries,
            available_width: 70,
            indicator_width: 10,
            has_secondary: false,
        });
        assert_eq!(split.action_area, ids(&commands, &[1, 3]));
        assert_eq!(split.overflow_area, ids(&commands, &[0, 2]));
    }

    #[test]
    fn equal_priorities_overflow_together() {
        let (commands, entries) = entries(&[10, 10, 10], &[0, 1, 1]);
        let split = resolve_overflow(OverflowInput {
            entries: &entries,
            available_width: 25,
            indicator_width: 0,
            has_secondary: false,
        });
        assert_eq!(split.action_area, ids(&commands, &[0]));
        assert_eq!(split.overflow_area, ids(&commands, &[1, 2]));
    }

    #[test]
    fn first_command_too_wide_overflows_everything() {
        let (commands, entries) = entries(&[90, 10], &[0, 1]);
        let split = resolve_overflow(OverflowInput {
            entries: &entries,
            available_width: 80,
            indicator_width: 5,
            has_secondary: false,
        });
        assert!(split.action_area.is_empty());
        assert_eq!(split.overflow_area, ids(&commands, &[0, 1]));
    }

    #[test]
    fn empty_input_resolves_to_empty_split() {
        let split = resolve_overflow(OverflowInput {
            entries: &[],
            available_width: 0,
            indicator_width: 5,
            has_secondary: true,
        });
        assert_eq!(split, OverflowSplit::default());
    }

    #[test]
    fn minimum_priority_still_overflows() {
        let (_, entries) = entries(&[10], &[i32::MIN]);
        let split = resolve_overflow(OverflowInput {
            entries: &entries,
            available_width: 5,
            indicator_width: 0,
            has_secondary: false,
        });
        assert_eq!(split.overflow_threshold, Some(i32::MIN));
        assert_eq!(split.overflow_area.len(), 1);
    }
}
