//! Dirty-stage tracking for the layout pipeline.
//!
//! Stages are ordered from most downstream (`Idle`) to most upstream
//! (`NewData`). Requests merge monotonically: marking a stage dirty never
//! lowers work that is already owed, so triggers that fire before a run
//! finishes are absorbed instead of dropped.

use serde::Serialize;

/// How much re-computation the pipeline owes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LayoutStage {
    #[default]
    Idle = 0,
    Layout = 1,
    Measuring = 2,
    NewData = 3,
}

impl LayoutStage {
    /// The stage that runs after this one succeeds.
    pub fn next(self) -> Self {
        match self {
            Self::NewData => Self::Measuring,
            Self::Measuring => Self::Layout,
            Self::Layout | Self::Idle => Self::Idle,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Layout => "layout",
            Self::Measuring => "measuring",
            Self::NewData => "new_data",
        }
    }
}

/// Outcome reported by a stage handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Complete,
    /// The stage could not run yet; it stays pending until the next trigger.
    Stalled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTracker {
    pending: LayoutStage,
}

impl StageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> LayoutStage {
        self.pending
    }

    pub fn is_idle(&self) -> bool {
        self.pending == LayoutStage::Idle
    }

    /// Raise the pending stage to at least `stage`.
    pub fn mark_dirty(&mut self, stage: LayoutStage) {
        self.pending = self.pending.max(stage);
    }

    /// Record that `stage` finished. A more upstream stage requested while the
    /// handler ran stays pending.
    pub fn complete(&mut self, stage: LayoutStage) {
        if self.pending == stage {
            self.pending = stage.next();
        }
    }

    /// Drive `handler` until the tracker is idle, a stage stalls, or
    /// `max_passes` handler calls have run. Returns the pending stage.
    pub fn run<F>(&mut self, max_passes: usize, mut handler: F) -> LayoutStage
    where
        F: FnMut(&mut Self, LayoutStage) -> StageOutcome,
    {
        let mut passes = 0;
        while !self.is_idle() && passes < max_passes {
            let stage = self.pending;
            passes += 1;
            match handler(self, stage) {
                StageOutcome::Complete => self.complete(stage),
                StageOutcome::Stalled => break,
            }
        }
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_dirty_takes_the_more_upstream_stage() {
        let mut tracker = StageTracker::new();
        tracker.mark_dirty(LayoutStage::Layout);
        tracker.mark_dirty(LayoutStage::NewData);
        tracker.mark_dirty(LayoutStage::Measuring);
        assert_eq!(tracker.pending(), LayoutStage::NewData);
    }

    #[test]
    fn run_visits_stages_in_pipeline_order() {
        let mut tracker = StageTracker::new();
        tracker.mark_dirty(LayoutStage::NewData);
        let mut seen = Vec::new();
        let end = tracker.run(16, |_, stage| {
            seen.push(stage);
            StageOutcome::Complete
        });
        assert_eq!(end, LayoutStage::Idle);
        assert_eq!(
            seen,
            vec![
                LayoutStage::NewData,
                LayoutStage::Measuring,
                LayoutStage::Layout
            ]
        );
    }

    #[test]
    fn stall_freezes_the_failing_stage() {
        let mut tracker = StageTracker::new();
        tracker.mark_dirty(LayoutStage::NewData);
        let end = tracker.run(16, |_, stage| {
            if stage == LayoutStage::Measuring {
                StageOutcome::Stalled
            } else {
                StageOutcome::Complete
            }
        });
        assert_eq!(end, LayoutStage::Measuring);

        tracker.mark_dirty(LayoutStage::Layout);
        assert_eq!(tracker.pending(), LayoutStage::Measuring);
    }

    #[test]
    fn rearm_during_handler_is_not_regressed() {
        let mut tracker = StageTracker::new();
        tracker.mark_dirty(LayoutStage::Measuring);
        let mut rearmed = false;
        let mut seen = Vec::new();
        tracker.run(16, |tracker, stage| {
            seen.push(stage);
            if stage == LayoutStage::Measuring && !rearmed {
                rearmed = true;
                tracker.mark_dirty(LayoutStage::NewData);
            }
            StageOutcome::Complete
        });
        assert_eq!(
            seen,
            vec![
                LayoutStage::Measuring,
                LayoutStage::NewData,
                LayoutStage::Measuring,
                LayoutStage::Layout
            ]
        );
    }

    #[test]
    fn pass_limit_stops_runaway_rearming() {
        let mut tracker = StageTracker::new();
        tracker.mark_dirty(LayoutStage::Layout);
        let end = tracker.run(3, |tracker, _| {
            tracker.mark_dirty(LayoutStage::NewData);
            StageOutcome::Complete
        });
        assert_eq!(end, LayoutStage::NewData);
    }
}
