use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::json;

use crate::command::{Command, CommandId, CommandKind, CommandList, CommandSet, DataChange, FlyoutRef};
use crate::error::{LayoutError, Result};
use crate::layout::{
    ChangeSet, CommandProjector, ContentFlyout, DEFAULT_CONTENT_LABEL, ElementPartition,
    FlyoutTarget, LayoutStage, MeasurementCache, Measurer, MenuItem, MenuItemKind,
    OverflowEntry, OverflowInput, OverflowSplit, ReservationPolicy, StageOutcome, StageTracker,
    diff_elements, resolve_overflow, resolve_priorities,
};
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv, json_ser};
use crate::metrics::LayoutMetrics;
use crate::surface::{ElementRef, HostSurface};

pub mod audit;
pub mod diagnostics;
pub mod scheduler;

use audit::{NullPipelineAudit, PipelineAudit, PipelineAuditEventBuilder, PipelineAuditStage};
use scheduler::{RefreshTask, TaskScheduler};

pub const LAYOUT_TARGET: &str = "cmdbar::layout";

/// Configuration knobs for the layout coordinator.
#[derive(Clone)]
pub struct LayoutConfig {
    /// Optional structured logger used by the coordinator.
    pub logger: Option<Logger>,
    /// Metrics accumulator shared with diagnostics observers.
    pub metrics: Option<Arc<Mutex<LayoutMetrics>>>,
    /// Target field used when emitting metrics snapshots.
    pub metrics_target: String,
    /// How the indicator reservation treats secondary commands.
    pub reservation: ReservationPolicy,
    /// Label for projected content commands without one.
    pub content_label: String,
    /// Upper bound on stage handler calls per pipeline run.
    pub max_pipeline_passes: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            logger: None,
            metrics: None,
            metrics_target: "cmdbar::layout.metrics".to_string(),
            reservation: ReservationPolicy::default(),
            content_label: DEFAULT_CONTENT_LABEL.to_string(),
            max_pipeline_passes: 8,
        }
    }
}

impl LayoutConfig {
    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(LayoutMetrics::new())));
        }
    }

    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    pub fn metrics_handle(&self) -> Option<Arc<Mutex<LayoutMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}

/// Result of a finished layout pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutSnapshot {
    pub split: OverflowSplit,
    pub menu: Vec<MenuItem>,
    pub indicator_visible: bool,
    pub available_width: u16,
}

impl LayoutSnapshot {
    /// Content hash of everything a host renders from this snapshot.
    pub fn fingerprint(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"action");
        for id in &self.split.action_area {
            hasher.update(&id.get().to_le_bytes());
        }
        hasher.update(b"overflow");
        for id in &self.split.overflow_area {
            hasher.update(&id.get().to_le_bytes());
        }
        hasher.update(b"menu");
        for item in &self.menu {
            hasher.update(&[
                menu_kind_tag(item.kind),
                u8::from(item.disabled),
                u8::from(item.selected),
            ]);
            hasher.update(&item.source.map(CommandId::get).unwrap_or(0).to_le_bytes());
            hasher.update(&(item.label.len() as u64).to_le_bytes());
            hasher.update(item.label.as_bytes());
            match &item.extra_class {
                Some(class) => {
                    hasher.update(&[1]);
                    hasher.update(&(class.len() as u64).to_le_bytes());
                    hasher.update(class.as_bytes());
                }
                None => {
                    hasher.update(&[0]);
                }
            }
            match &item.flyout {
                Some(FlyoutTarget::External(flyout)) => {
                    hasher.update(&[1]);
                    hasher.update(&(flyout.len() as u64).to_le_bytes());
                    hasher.update(flyout.as_bytes());
                }
                Some(FlyoutTarget::SharedContent(id)) => {
                    hasher.update(&[2]);
                    hasher.update(&id.get().to_le_bytes());
                }
                None => {
                    hasher.update(&[0]);
                }
            }
        }
        hasher.update(&[u8::from(self.indicator_visible)]);
        hasher.update(&self.available_width.to_le_bytes());
        hasher.finalize()
    }
}

fn menu_kind_tag(kind: MenuItemKind) -> u8 {
    match kind {
        MenuItemKind::Button => 0,
        MenuItemKind::Toggle => 1,
        MenuItemKind::Flyout => 2,
        MenuItemKind::Separator => 3,
    }
}

/// What invoking an overflow menu item did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuInvocation {
    /// Separators and disabled items do nothing.
    Ignored,
    Invoked(CommandId),
    /// A toggle flipped the `selected` state of the command it mirrors.
    Toggled { id: CommandId, selected: bool },
    /// The host should open this flyout.
    OpenFlyout(FlyoutRef),
    /// The content command now lives in the shared content flyout.
    ContentFlyoutShown(CommandId),
}

/// Context handed to observers; stage requests apply after the hook returns.
pub struct LayoutContext<'a> {
    commands: &'a CommandList,
    stage: LayoutStage,
    requested: LayoutStage,
}

impl<'a> LayoutContext<'a> {
    fn new(commands: &'a CommandList, stage: LayoutStage) -> Self {
        Self {
            commands,
            stage,
            requested: LayoutStage::Idle,
        }
    }

    pub fn commands(&self) -> &CommandList {
        self.commands
    }

    /// Stage the pipeline is running.
    pub fn stage(&self) -> LayoutStage {
        self.stage
    }

    /// Ask for another pipeline pass starting at `stage`.
    pub fn request_stage(&mut self, stage: LayoutStage) {
        self.requested = self.requested.max(stage);
    }
}

/// Typed hooks around each layout pass.
pub trait LayoutObserver: Send {
    fn name(&self) -> &str {
        "layout_observer"
    }

    fn before_layout(&mut self, _ctx: &mut LayoutContext<'_>) {}

    fn after_layout(&mut self, _ctx: &mut LayoutContext<'_>, _snapshot: &LayoutSnapshot) {}

    /// Element classification for the animation collaborator.
    fn on_changes(&mut self, _ctx: &mut LayoutContext<'_>, _changes: &ChangeSet) {}
}

fn dispatch<F>(
    observers: &mut [Box<dyn LayoutObserver>],
    commands: &CommandList,
    stage: LayoutStage,
    mut hook: F,
) -> LayoutStage
where
    F: FnMut(&mut Box<dyn LayoutObserver>, &mut LayoutContext<'_>),
{
    let mut requested = LayoutStage::Idle;
    for observer in observers.iter_mut() {
        let mut ctx = LayoutContext::new(commands, stage);
        hook(observer, &mut ctx);
        requested = requested.max(ctx.requested);
    }
    requested
}

/// Layout coordinator: the only entry point a host drives.
pub struct CommandLayout<S: HostSurface> {
    surface: S,
    commands: CommandList,
    command_set: CommandSet,
    tracker: StageTracker,
    measurer: Measurer,
    cache: Option<MeasurementCache>,
    snapshot: Option<LayoutSnapshot>,
    last_fingerprint: Option<blake3::Hash>,
    last_changes: Option<ChangeSet>,
    rendered: Vec<CommandId>,
    synced: HashSet<CommandId>,
    content_flyout: ContentFlyout,
    scheduler: Option<Box<dyn TaskScheduler>>,
    pending_refresh: Option<u64>,
    refresh_sequence: u64,
    coalesced: u64,
    observers: Vec<Box<dyn LayoutObserver>>,
    audit: Arc<dyn PipelineAudit>,
    config: LayoutConfig,
}

impl<S: HostSurface> CommandLayout<S> {
    pub fn new(surface: S, commands: Vec<Command>) -> Result<Self> {
        Self::with_config(surface, commands, LayoutConfig::default())
    }

    pub fn with_config(mut surface: S, commands: Vec<Command>, config: LayoutConfig) -> Result<Self> {
        if surface.control_attached() {
            return Err(LayoutError::DuplicateControl);
        }
        let commands = CommandList::from_commands(commands)?;
        surface.attach_control();

        let mut tracker = StageTracker::new();
        tracker.mark_dirty(LayoutStage::NewData);

        Ok(Self {
            surface,
            command_set: commands.command_set(),
            commands,
            tracker,
            measurer: Measurer::new(),
            cache: None,
            snapshot: None,
            last_fingerprint: None,
            last_changes: None,
            rendered: Vec::new(),
            synced: HashSet::new(),
            content_flyout: ContentFlyout::new(),
            scheduler: None,
            pending_refresh: None,
            refresh_sequence: 0,
            coalesced: 0,
            observers: Vec::new(),
            audit: Arc::new(NullPipelineAudit),
            config,
        })
    }

    /// Defer data-change refreshes through `scheduler`. Without one, every
    /// change runs the pipeline immediately.
    pub fn with_scheduler<T>(mut self, scheduler: T) -> Self
    where
        T: TaskScheduler + 'static,
    {
        self.scheduler = Some(Box::new(scheduler));
        self
    }

    pub fn register_observer<O>(&mut self, observer: O)
    where
        O: LayoutObserver + 'static,
    {
        self.log_layout_event(
            LogLevel::Debug,
            "observer_registered",
            [json_kv("observer", json!(observer.name()))],
        );
        self.observers.push(Box::new(observer));
    }

    pub fn set_audit(&mut self, audit: Arc<dyn PipelineAudit>) {
        self.audit = audit;
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Changes to the reservation policy or content label apply on the next layout.
    pub fn config_mut(&mut self) -> &mut LayoutConfig {
        self.tracker.mark_dirty(LayoutStage::Layout);
        &mut self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn commands(&self) -> &CommandList {
        &self.commands
    }

    pub fn command(&self, id: CommandId) -> Option<&Command> {
        self.commands.get(id)
    }

    pub fn stage(&self) -> LayoutStage {
        self.tracker.pending()
    }

    pub fn measurements(&self) -> Option<&MeasurementCache> {
        self.cache.as_ref()
    }

    pub fn snapshot(&self) -> Option<&LayoutSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn split(&self) -> Option<&OverflowSplit> {
        self.snapshot.as_ref().map(|snapshot| &snapshot.split)
    }

    pub fn action_commands(&self) -> Vec<&Command> {
        self.split()
            .map(|split| self.lookup(&split.action_area))
            .unwrap_or_default()
    }

    /// Overflowing primary commands, in declared order.
    pub fn overflow_commands(&self) -> Vec<&Command> {
        self.split()
            .map(|split| self.lookup(&split.overflow_area))
            .unwrap_or_default()
    }

    pub fn menu_items(&self) -> &[MenuItem] {
        self.snapshot
            .as_ref()
            .map(|snapshot| snapshot.menu.as_slice())
            .unwrap_or(&[])
    }

    pub fn overflow_indicator_visible(&self) -> bool {
        self.snapshot
            .as_ref()
            .is_some_and(|snapshot| snapshot.indicator_visible)
    }

    pub fn last_changes(&self) -> Option<&ChangeSet> {
        self.last_changes.as_ref()
    }

    pub fn content_flyout(&self) -> &ContentFlyout {
        &self.content_flyout
    }

    pub fn refresh_pending(&self) -> bool {
        self.pending_refresh.is_some()
    }

    fn lookup(&self, ids: &[CommandId]) -> Vec<&Command> {
        ids.iter().filter_map(|id| self.commands.get(*id)).collect()
    }

    /// Remeasure and relayout, e.g. after the container changed size without a resize notification.
    pub fn force_layout(&mut self) -> LayoutStage {
        self.tracker.mark_dirty(LayoutStage::Measuring);
        self.run_pipeline()
    }

    /// The action area changed size.
    pub fn notify_resized(&mut self) -> LayoutStage {
        if self.surface.is_attached_and_sized() {
            let width = self.surface.measure_container_content_width();
            if let Some(cache) = self.cache.as_mut() {
                if cache.container != width {
                    cache.set_container_width(width);
                    self.tracker.mark_dirty(LayoutStage::Layout);
                }
            }
            self.log_layout_event(
                LogLevel::Debug,
                "container_resized",
                [json_kv("width", json!(width))],
            );
        }
        self.run_pipeline()
    }

    /// The command collection changed; the refresh is coalesced through the scheduler.
    pub fn notify_data_changed(&mut self, change: DataChange) {
        self.cache = None;
        self.log_layout_event(
            LogLevel::Trace,
            "data_changed",
            [json_ser("change", &change)],
        );
        self.invalidate(LayoutStage::NewData);
    }

    /// Run the refresh a scheduler handed back.
    pub fn refresh(&mut self, task: RefreshTask) -> LayoutStage {
        if self.pending_refresh == Some(task.sequence()) {
            self.pending_refresh = None;
            self.log_layout_event(
                LogLevel::Debug,
                "refresh_started",
                [
                    json_kv("sequence", json!(task.sequence())),
                    json_kv("coalesced", json!(self.coalesced)),
                ],
            );
            self.coalesced = 0;
        }
        self.run_pipeline()
    }

    pub fn insert_command(&mut self, index: usize, command: Command) -> Result<CommandId> {
        let id = command.id();
        let change = self.commands.insert(index, command)?;
        self.notify_data_changed(change);
        Ok(id)
    }

    pub fn push_command(&mut self, command: Command) -> Result<CommandId> {
        let id = command.id();
        let change = self.commands.push(command)?;
        self.notify_data_changed(change);
        Ok(id)
    }

    pub fn remove_command(&mut self, id: CommandId) -> Result<Command> {
        let (command, change) = self.commands.remove(id)?;
        self.notify_data_changed(change);
        Ok(command)
    }

    pub fn move_command(&mut self, id: CommandId, to: usize) -> Result<()> {
        let change = self.commands.move_to(id, to)?;
        self.notify_data_changed(change);
        Ok(())
    }

    pub fn reload_commands(&mut self, commands: Vec<Command>) -> Result<()> {
        let change = self.commands.reload(commands)?;
        self.notify_data_changed(change);
        Ok(())
    }

    /// Mutate one command. Structural edits rebuild the command set,
    /// presentation-only edits just relayout.
    pub fn update_command<F>(&mut self, id: CommandId, update: F) -> Result<()>
    where
        F: FnOnce(&mut Command),
    {
        let command = self
            .commands
            .get_mut(id)
            .ok_or(LayoutError::CommandNotFound(id))?;
        let before = command.clone();
        update(command);

        if before.structure_differs(command) {
            self.notify_data_changed(DataChange::Update { id });
        } else if before.presentation_differs(command) {
            if self.synced.contains(&id) {
                self.surface.sync_element(command);
            }
            self.invalidate(LayoutStage::Layout);
        }
        Ok(())
    }

    pub fn invoke_menu_item(&mut self, index: usize) -> Result<MenuInvocation> {
        let item = self
            .menu_items()
            .get(index)
            .cloned()
            .ok_or(LayoutError::MenuItemNotFound(index))?;
        if item.is_separator() || item.disabled {
            return Ok(MenuInvocation::Ignored);
        }
        let Some(id) = item.source else {
            return Ok(MenuInvocation::Ignored);
        };

        match item.flyout {
            Some(FlyoutTarget::SharedContent(content)) => {
                self.show_content_flyout(content)?;
                return Ok(MenuInvocation::ContentFlyoutShown(content));
            }
            Some(FlyoutTarget::External(flyout)) => {
                if let Some(action) = item.on_invoke.as_ref() {
                    action(id);
                }
                return Ok(MenuInvocation::OpenFlyout(flyout));
            }
            None => {}
        }

        if item.kind == MenuItemKind::Toggle {
            let command = self
                .commands
                .get_mut(id)
                .ok_or(LayoutError::CommandNotFound(id))?;
            command.selected = !command.selected;
            let selected = command.selected;
            if self.synced.contains(&id) {
                self.surface.sync_element(command);
            }
            if let Some(action) = item.on_invoke.as_ref() {
                action(id);
            }
            self.tracker.mark_dirty(LayoutStage::Layout);
            self.run_pipeline();
            return Ok(MenuInvocation::Toggled { id, selected });
        }

        if let Some(action) = item.on_invoke.as_ref() {
            action(id);
        }
        Ok(MenuInvocation::Invoked(id))
    }

    /// Move a content command's element into the shared content flyout.
    pub fn show_content_flyout(&mut self, id: CommandId) -> Result<()> {
        match self.commands.get(id) {
            Some(command) if command.kind == CommandKind::Content => {}
            _ => return Err(LayoutError::CommandNotFound(id)),
        }
        self.content_flyout.show(&mut self.surface, id);
        self.log_layout_event(
            LogLevel::Debug,
            "content_flyout_shown",
            [json_ser("command", &id)],
        );
        Ok(())
    }

    pub fn hide_content_flyout(&mut self) -> Option<CommandId> {
        let hosted = self.content_flyout.hide(&mut self.surface)?;
        self.log_layout_event(
            LogLevel::Debug,
            "content_flyout_hidden",
            [json_ser("command", &hosted)],
        );
        Some(hosted)
    }

    fn invalidate(&mut self, stage: LayoutStage) {
        self.tracker.mark_dirty(stage);
        if self.scheduler.is_none() {
            self.run_pipeline();
            return;
        }
        if self.pending_refresh.is_some() {
            self.coalesced = self.coalesced.saturating_add(1);
            self.record_metric(LayoutMetrics::record_coalesced_refresh);
            self.record_audit(PipelineAuditEventBuilder::new(
                PipelineAuditStage::RefreshCoalesced,
            ));
            return;
        }

        self.refresh_sequence = self.refresh_sequence.wrapping_add(1);
        let task = RefreshTask::new(self.refresh_sequence);
        self.pending_refresh = Some(task.sequence());
        if let Some(scheduler) = self.scheduler.as_mut() {
            scheduler.schedule(task);
        }
        self.record_audit(
            PipelineAuditEventBuilder::new(PipelineAuditStage::RefreshScheduled)
                .detail("sequence", json!(task.sequence())),
        );
    }

    /// Run every pending stage until idle or a stall.
    pub fn run_pipeline(&mut self) -> LayoutStage {
        if self.tracker.is_idle() {
            return LayoutStage::Idle;
        }
        self.record_metric(LayoutMetrics::record_pipeline_run);

        let max_passes = self.config.max_pipeline_passes.max(1);
        let mut tracker = std::mem::take(&mut self.tracker);
        let mut stalled = false;
        let end = tracker.run(max_passes, |tracker, stage| {
            let outcome = self.run_stage(tracker, stage);
            stalled = outcome == StageOutcome::Stalled;
            outcome
        });
        self.tracker = tracker;

        if end != LayoutStage::Idle && !stalled {
            self.log_layout_event(
                LogLevel::Warn,
                "pass_limit_reached",
                [
                    json_kv("pending", json!(end.as_str())),
                    json_kv("max_passes", json!(max_passes)),
                ],
            );
            self.record_audit(
                PipelineAuditEventBuilder::new(PipelineAuditStage::PassLimitReached)
                    .detail("pending", json!(end.as_str())),
            );
        }
        end
    }

    fn run_stage(&mut self, tracker: &mut StageTracker, stage: LayoutStage) -> StageOutcome {
        self.record_audit(PipelineAuditEventBuilder::new(
            PipelineAuditStage::StageEntered(stage),
        ));
        let outcome = match stage {
            LayoutStage::NewData => self.process_new_data(tracker),
            LayoutStage::Measuring => self.measure(),
            LayoutStage::Layout => self.layout(tracker),
            LayoutStage::Idle => StageOutcome::Complete,
        };

        match outcome {
            StageOutcome::Complete => {
                self.record_audit(PipelineAuditEventBuilder::new(
                    PipelineAuditStage::StageCompleted(stage),
                ));
            }
            StageOutcome::Stalled => {
                self.record_metric(LayoutMetrics::record_stall);
                self.record_audit(PipelineAuditEventBuilder::new(
                    PipelineAuditStage::StageStalled(stage),
                ));
                self.log_layout_event(
                    LogLevel::Debug,
                    "pipeline_stalled",
                    [json_kv("stage", json!(stage.as_str()))],
                );
            }
        }
        outcome
    }

    fn process_new_data(&mut self, tracker: &mut StageTracker) -> StageOutcome {
        self.command_set = self.commands.command_set();
        self.cache = None;
        self.snapshot = None;

        let mut current = ElementPartition::default();
        let mut displayed = HashSet::new();
        for id in &self.rendered {
            if self.surface.is_visible(ElementRef::Command(*id)) {
                current.visible.push(*id);
                displayed.insert(*id);
            } else {
                current.hidden.push(*id);
            }
        }

        let rendered: HashSet<CommandId> = self.rendered.iter().copied().collect();
        let mut next = ElementPartition::default();
        for id in &self.command_set.primary {
            let Some(command) = self.commands.get(*id) else {
                continue;
            };
            if command.hidden {
                continue;
            }
            if rendered.contains(id) && !displayed.contains(id) {
                next.hidden.push(*id);
            } else {
                next.visible.push(*id);
            }
        }
        let changes = diff_elements(&current, &next);

        let stale: Vec<CommandId> = self
            .synced
            .iter()
            .filter(|id| !self.commands.contains(**id))
            .copied()
            .collect();
        for id in stale {
            if self.content_flyout.hosted() == Some(id) {
                self.content_flyout.hide(&mut self.surface);
            }
            self.surface.release_element(id);
            self.synced.remove(&id);
        }
        for command in self.commands.iter() {
            self.surface.sync_element(command);
            self.synced.insert(command.id());
        }

        self.surface.append_in_order(&self.command_set.primary);
        for command in self.commands.iter().filter(|c| c.is_primary() && c.hidden) {
            self.surface.set_visible(ElementRef::Command(command.id()), false);
        }
        self.rendered = self.command_set.primary.clone();

        let requested = dispatch(
            &mut self.observers,
            &self.commands,
            LayoutStage::NewData,
            |observer, ctx| observer.on_changes(ctx, &changes),
        );
        tracker.mark_dirty(requested);

        self.log_layout_event(
            LogLevel::Debug,
            "data_processed",
            [
                json_kv("primary", json!(self.command_set.primary.len())),
                json_kv("secondary", json!(self.command_set.secondary.len())),
                json_kv("added", json!(changes.added.len())),
                json_kv("deleted", json!(changes.deleted.len())),
                json_kv("affected", json!(changes.affected.len())),
            ],
        );
        self.last_changes = Some(changes);
        StageOutcome::Complete
    }

    fn measure(&mut self) -> StageOutcome {
        let primary = self
            .command_set
            .primary
            .iter()
            .filter_map(|id| self.commands.get(*id));
        let Some(cache) = self.measurer.measure(&mut self.surface, primary) else {
            return StageOutcome::Stalled;
        };

        self.record_metric(LayoutMetrics::record_measurement);
        self.log_layout_event(
            LogLevel::Debug,
            "measured",
            [
                json_kv("container", json!(cache.container)),
                json_kv("standard", json!(cache.standard)),
                json_kv("separator", json!(cache.separator)),
                json_kv("indicator", json!(cache.overflow_indicator)),
                json_kv("content_entries", json!(cache.content_entries())),
            ],
        );
        self.cache = Some(cache);
        StageOutcome::Complete
    }

    fn layout(&mut self, tracker: &mut StageTracker) -> StageOutcome {
        if self.cache.is_none() {
            tracker.mark_dirty(LayoutStage::Measuring);
            return StageOutcome::Complete;
        }

        let requested = dispatch(
            &mut self.observers,
            &self.commands,
            LayoutStage::Layout,
            |observer, ctx| observer.before_layout(ctx),
        );
        tracker.mark_dirty(requested);

        let Some(cache) = self.cache.as_ref() else {
            return StageOutcome::Complete;
        };
        let primary: Vec<&Command> = self
            .command_set
            .primary
            .iter()
            .filter_map(|id| self.commands.get(*id))
            .collect();
        let priorities = resolve_priorities(primary.iter().copied());
        let entries: Vec<OverflowEntry> = primary
            .iter()
            .zip(priorities)
            .filter(|(command, _)| !command.hidden)
            .map(|(command, priority)| OverflowEntry {
                id: command.id(),
                priority,
                width: cache.command_width(command),
            })
            .collect();

        let has_secondary = match self.config.reservation {
            ReservationPolicy::Compatible => self.command_set.has_secondary(),
            ReservationPolicy::VisibleSecondary => self
                .command_set
                .secondary
                .iter()
                .filter_map(|id| self.commands.get(*id))
                .any(|command| !command.hidden),
        };

        let split = resolve_overflow(OverflowInput {
            entries: &entries,
            available_width: cache.container,
            indicator_width: cache.overflow_indicator,
            has_secondary,
        });

        let in_action_area: HashSet<CommandId> = split.action_area.iter().copied().collect();
        for command in &primary {
            let id = command.id();
            self.surface
                .set_visible(ElementRef::Command(id), in_action_area.contains(&id));
        }

        let overflowing = split
            .overflow_area
            .iter()
            .filter_map(|id| self.commands.get(*id));
        let secondary = self
            .command_set
            .secondary
            .iter()
            .filter_map(|id| self.commands.get(*id));
        let menu = CommandProjector::new(self.config.content_label.as_str())
            .project(overflowing, secondary);

        let indicator_visible = !menu.is_empty();
        self.surface
            .set_visible(ElementRef::OverflowIndicator, indicator_visible);

        let snapshot = LayoutSnapshot {
            split,
            menu,
            indicator_visible,
            available_width: cache.container,
        };

        if let Some(hosted) = self.content_flyout.hosted() {
            let still_projected = snapshot
                .menu
                .iter()
                .any(|item| item.flyout == Some(FlyoutTarget::SharedContent(hosted)));
            if !still_projected {
                self.content_flyout.hide(&mut self.surface);
            }
        }

        let fingerprint = snapshot.fingerprint();
        let changed = self.last_fingerprint != Some(fingerprint);
        self.last_fingerprint = Some(fingerprint);
        let overflowed = snapshot.split.overflow_area.len();
        self.record_metric(|metrics| metrics.record_layout(overflowed, changed));
        self.log_layout_event(
            if changed {
                LogLevel::Info
            } else {
                LogLevel::Debug
            },
            "layout_completed",
            [
                json_kv("visible", json!(snapshot.split.action_area.len())),
                json_kv("overflowed", json!(overflowed)),
                json_kv("menu_items", json!(snapshot.menu.len())),
                json_kv("indicator_visible", json!(indicator_visible)),
                json_kv("changed", json!(changed)),
            ],
        );

        let requested = dispatch(
            &mut self.observers,
            &self.commands,
            LayoutStage::Layout,
            |observer, ctx| observer.after_layout(ctx, &snapshot),
        );
        tracker.mark_dirty(requested);
        self.snapshot = Some(snapshot);
        StageOutcome::Complete
    }

    fn record_metric<F>(&self, record: F)
    where
        F: FnOnce(&mut LayoutMetrics),
    {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                record(&mut guard);
            }
        }
    }

    fn record_audit(&self, builder: PipelineAuditEventBuilder) {
        self.audit.record(builder.finish());
    }

    fn log_layout_event<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        if let Some(logger) = self.config.logger.as_ref() {
            if !logger.enabled(level) {
                return;
            }
            let event = event_with_fields(level, LAYOUT_TARGET, message, fields);
            let _ = logger.log_event(event);
        }
    }
}
