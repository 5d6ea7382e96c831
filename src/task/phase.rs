use tracing::debug;

/// Label set for a task's internal phases.
///
/// Implement this on a small `Copy` enum describing the stages a task moves
/// through. Entering a different phase counts as progress for the watchdog,
/// so a task that advances through its phases is never considered stuck.
pub trait Phase: Copy + Eq + std::fmt::Debug {
    fn label(&self) -> &'static str;
}

pub(crate) const INITIAL_PHASE: &str = "init";

/// Tracks which phase a task is in and how long it has waited there.
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    label: &'static str,
    wait_ticks: u64,
    started_at_tick: u64,
    max_wait_ticks: Option<u64>,
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self {
            label: INITIAL_PHASE,
            wait_ticks: 0,
            started_at_tick: 0,
            max_wait_ticks: None,
        }
    }

    /// Limit on ticks spent in any single phase before `is_timed_out`
    /// reports true. Tasks decide what to do about it.
    pub fn with_max_wait_ticks(mut self, ticks: u64) -> Self {
        self.max_wait_ticks = Some(ticks);
        self
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn wait_ticks(&self) -> u64 {
        self.wait_ticks
    }

    pub fn started_at_tick(&self) -> u64 {
        self.started_at_tick
    }

    pub fn has_waited(&self, ticks: u64) -> bool {
        self.wait_ticks >= ticks
    }

    pub fn is_timed_out(&self) -> bool {
        self.max_wait_ticks
            .is_some_and(|max| self.wait_ticks > max)
    }

    /// Enter a phase. The wait counter restarts either way; the return value
    /// says whether the phase actually changed.
    pub fn enter<P: Phase>(&mut self, phase: P, now_tick: u64) -> bool {
        self.enter_label(phase.label(), now_tick)
    }

    pub(crate) fn enter_label(&mut self, label: &'static str, now_tick: u64) -> bool {
        let changed = self.label != label;
        if changed {
            debug!(from = self.label, to = label, tick = now_tick, "phase transition");
        }
        self.label = label;
        self.wait_ticks = 0;
        self.started_at_tick = now_tick;
        changed
    }

    /// Advance the wait counter by one tick.
    pub(crate) fn tick(&mut self) {
        self.wait_ticks += 1;
    }

    pub(crate) fn reset(&mut self) {
        self.label = INITIAL_PHASE;
        self.wait_ticks = 0;
        self.started_at_tick = 0;
    }
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}
