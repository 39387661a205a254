//! Measurement of the widths the overflow resolver needs.
//!
//! Commands of the same non-content kind are assumed to share a width, so
//! only the first representative of each bucket is measured. Content commands
//! are measured individually and keyed by identity.

use std::collections::HashMap;

use serde::Serialize;

use crate::command::{Command, CommandId, CommandKind};
use crate::surface::{ElementRef, HostSurface};

/// Widths captured for one command set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MeasurementCache {
    pub overflow_indicator: u16,
    pub separator: u16,
    pub standard: u16,
    content: HashMap<CommandId, u16>,
    pub container: u16,
}

impl MeasurementCache {
    pub fn content_width(&self, id: CommandId) -> Option<u16> {
        self.content.get(&id).copied()
    }

    pub fn content_entries(&self) -> usize {
        self.content.len()
    }

    /// Width a command occupies in the action area.
    pub fn command_width(&self, command: &Command) -> u16 {
        match command.kind {
            kind if kind.is_standard() => self.standard,
            CommandKind::Separator => self.separator,
            _ => self.content_width(command.id()).unwrap_or(0),
        }
    }

    pub fn set_container_width(&mut self, width: u16) {
        self.container = width;
    }
}

/// Fills a [`MeasurementCache`] from the host surface.
#[derive(Debug, Default, Clone, Copy)]
pub struct Measurer;

impl Measurer {
    pub fn new() -> Self {
        Self
    }

    /// Measure `primary` commands, or `None` while the action area cannot be measured.
    pub fn measure<'a, S, I>(&self, surface: &mut S, primary: I) -> Option<MeasurementCache>
    where
        S: HostSurface + ?Sized,
        I: IntoIterator<Item = &'a Command>,
    {
        if !surface.is_attached_and_sized() {
            return None;
        }
        let container = surface.measure_container_content_width();
        if container == 0 {
            return None;
        }

        let mut cache = MeasurementCache {
            overflow_indicator: measure_visible(surface, ElementRef::OverflowIndicator),
            container,
            ..MeasurementCache::default()
        };

        let mut separator = None;
        let mut standard = None;
        for command in primary {
            let element = ElementRef::Command(command.id());
            match command.kind {
                kind if kind.is_standard() => {
                    if standard.is_none() {
                        standard = Some(measure_visible(surface, element));
                    }
                }
                CommandKind::Separator => {
                    if separator.is_none() {
                        separator = Some(measure_visible(surface, element));
                    }
                }
                _ => {
                    if !cache.content.contains_key(&command.id()) {
                        let width = measure_visible(surface, element);
                        cache.content.insert(command.id(), width);
                    }
                }
            }
        }

        cache.separator = separator.unwrap_or(0);
        cache.standard = standard.unwrap_or(0);
        Some(cache)
    }
}

fn measure_visible<S>(surface: &mut S, element: ElementRef) -> u16
where
    S: HostSurface + ?Sized,
{
    let was_visible = surface.is_visible(element);
    if !was_visible {
        surface.set_visible(element, true);
    }
    let width = surface.measure_width(element);
    if !was_visible {
        surface.set_visible(element, false);
    }
    width
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::TerminalSurface;

    fn synced(surface: &mut TerminalSurface, commands: &[Command]) {
        for command in commands {
            surface.sync_element(command);
        }
        let ids: Vec<_> = commands.iter().map(Command::id).collect();
        surface.append_in_order(&ids);
    }

    #[test]
    fn unattached_surface_fails_without_cache() {
        let mut surface = TerminalSurface::with_default();
        let commands = vec![Command::button("a")];
        synced(&mut surface, &commands);
        assert!(Measurer::new().measure(&mut surface, &commands).is_none());
    }

    #[test]
    fn one_width_per_bucket_and_per_content() {
        let mut surface = TerminalSurface::with_default();
        surface.attach(80);
        let commands = vec![
            Command::button("a"),
            Command::toggle("b"),
            Command::separator(),
            Command::content("slider"),
            Command::content("xy"),
            Command::separator(),
        ];
        synced(&mut surface, &commands);

        let cache = Measurer::new().measure(&mut surface, &commands).unwrap();
        assert_eq!(cache.standard, 12);
        assert_eq!(cache.separator, 3);
        assert_eq!(cache.overflow_indicator, 3);
        assert_eq!(cache.container, 80);
        assert_eq!(cache.content_entries(), 2);
        assert_eq!(cache.content_width(commands[3].id()), Some(8));
        assert_eq!(cache.command_width(&commands[4]), 4);
    }

    #[test]
    fn hidden_elements_are_measured_and_restored() {
        let mut surface = TerminalSurface::with_default();
        surface.attach(40);
        let commands = vec![Command::button("a"), Command::content("cc")];
        synced(&mut surface, &commands);
        for command in &commands {
            surface.set_visible(ElementRef::Command(command.id()), false);
        }

        let cache = Measurer::new().measure(&mut surface, &commands).unwrap();
        assert_eq!(cache.standard, 12);
        assert_eq!(cache.command_width(&commands[1]), 4);
        assert!(!surface.is_visible(ElementRef::Command(commands[0].id())));
        assert!(!surface.is_visible(ElementRef::Command(commands[1].id())));
        assert!(!surface.is_visible(ElementRef::OverflowIndicator));
    }

    #[test]
    fn flyouts_and_toggles_share_the_standard_width() {
        let mut surface = TerminalSurface::with_default();
        surface.attach(60);
        let commands = vec![
            Command::flyout("more", "panel"),
            Command::toggle("wrap"),
            Command::button("save"),
            Command::content("vol"),
        ];
        synced(&mut surface, &commands);

        let cache = Measurer::new().measure(&mut surface, &commands).unwrap();
        assert_eq!(cache.standard, 12);
        assert_eq!(cache.content_entries(), 1);
        for command in &commands[..3] {
            assert!(command.kind.is_standard());
            assert_eq!(cache.command_width(command), 12);
        }
        assert!(!commands[3].kind.is_standard());
        assert_eq!(cache.command_width(&commands[3]), 5);
    }

    #[test]
    fn missing_buckets_measure_zero() {
        let mut surface = TerminalSurface::with_default();
        surface.attach(40);
        let commands = vec![Command::content("only")];
        synced(&mut surface, &commands);

        let cache = Measurer::new().measure(&mut surface, &commands).unwrap();
        assert_eq!(cache.standard, 0);
        assert_eq!(cache.separator, 0);
    }
}
