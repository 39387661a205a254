use std::io;

use cmdbar::logging::{LogEvent, LogSink};
use cmdbar::runtime::diagnostics::{LifecycleLoggerObserver, MetricsSnapshotObserver};
use cmdbar::{
    AnsiRenderer, Command, CommandLayout, LayoutConfig, Logger, LoggingResult, OverflowEntry,
    OverflowInput, Rect, TerminalSurface, resolve_overflow, resolve_priorities,
};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

#[derive(Clone, Default)]
struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _event: &LogEvent) -> LoggingResult<()> {
        Ok(())
    }
}

fn toolbar(count: usize) -> Vec<Command> {
    (0..count)
        .map(|idx| match idx % 7 {
            0 => Command::separator(),
            1 => Command::toggle(format!("toggle{idx}")),
            2 => Command::content(format!("\x1b[36mcontent{idx}\x1b[0m")),
            3 => Command::button(format!("more{idx}")).secondary(),
            4 => Command::button(format!("pinned{idx}")).with_priority(-10),
            _ => Command::button(format!("button{idx}")),
        })
        .collect()
}

fn resolver_only(c: &mut Criterion) {
    let commands = toolbar(64);
    let primary: Vec<&Command> = commands.iter().filter(|c| c.is_primary()).collect();
    let priorities = resolve_priorities(primary.iter().copied());
    let entries: Vec<OverflowEntry> = primary
        .iter()
        .zip(priorities)
        .map(|(command, priority)| OverflowEntry {
            id: command.id(),
            priority,
            width: 12,
        })
        .collect();

    c.bench_function("resolve_overflow_64", |b| {
        b.iter(|| {
            resolve_overflow(black_box(OverflowInput {
                entries: &entries,
                available_width: 200,
                indicator_width: 3,
                has_secondary: true,
            }))
        });
    });
}

fn resize_sweep(c: &mut Criterion) {
    c.bench_function("layout_resize_sweep", |b| {
        b.iter(|| {
            let mut surface = TerminalSurface::with_default();
            surface.attach(240);
            let mut config = LayoutConfig::default();
            config.logger = Some(Logger::new(NullSink));
            config.enable_metrics();
            let metrics = config.metrics_handle().expect("metrics");
            let mut layout =
                CommandLayout::with_config(surface, toolbar(32), config).expect("layout");
            layout.register_observer(LifecycleLoggerObserver::new(Logger::new(NullSink)));
            layout.register_observer(MetricsSnapshotObserver::new(Logger::new(NullSink), metrics));
            layout.run_pipeline();

            for width in (20..240).step_by(10).rev() {
                layout.surface_mut().resize(black_box(width));
                layout.notify_resized();
            }
        });
    });
}

fn render_bar(c: &mut Criterion) {
    let mut surface = TerminalSurface::with_default();
    surface.attach(120);
    let mut layout = CommandLayout::new(surface, toolbar(32)).expect("layout");
    layout.run_pipeline();
    let mut renderer = AnsiRenderer::with_default();

    c.bench_function("render_bar_and_menu", |b| {
        b.iter(|| {
            let mut sink = io::sink();
            renderer
                .render_bar(&mut sink, Rect::new(0, 0, 120, 1), layout.surface())
                .expect("bar");
            renderer
                .render_menu(&mut sink, Rect::new(90, 1, 30, 20), layout.menu_items())
                .expect("menu");
        });
    });
}

criterion_group!(benches, resolver_only, resize_sweep, render_bar);
criterion_main!(benches);
