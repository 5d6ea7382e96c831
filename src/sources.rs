//! Collaborator interfaces the scheduler polls each tick.

use serde::{Deserialize, Serialize};

use crate::context::TaskContext;
use crate::task::Task;

/// Version of the collaborator interfaces. Bumped on breaking changes so
/// out-of-tree implementations can assert compatibility at startup.
pub const SOURCE_API_VERSION: u32 = 1;

/// Category of a behavioral break, reported back to the source when the
/// break's task finishes so it can plan the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakKind {
    MicroPause,
    ShortBreak,
    LongBreak,
    SessionEnd,
}

impl std::fmt::Display for BreakKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BreakKind::MicroPause => "micro_pause",
            BreakKind::ShortBreak => "short_break",
            BreakKind::LongBreak => "long_break",
            BreakKind::SessionEnd => "session_end",
        };
        write!(f, "{}", s)
    }
}

/// A break the behavioral source wants executed at the next safe boundary.
pub struct ScheduledBreak {
    pub kind: BreakKind,
    pub task: Box<dyn Task>,
}

/// Supplies emergency-response tasks. Checked every tick, before anything
/// else runs, so a produced task preempts whatever is active.
pub trait EmergencySource: Send {
    fn check_emergencies(&mut self, ctx: &dyn TaskContext) -> Option<Box<dyn Task>>;
}

/// Supplies humanization breaks. Only consulted at safe boundaries, after
/// the active task has signalled that its current step is complete.
pub trait BehavioralSource: Send {
    fn scheduled_break(&mut self) -> Option<ScheduledBreak>;

    /// Called when a break's task completes, with the wall clock time the
    /// break actually took. Breaks abandoned for an emergency are not
    /// reported.
    fn on_break_completed(&mut self, kind: BreakKind, actual: std::time::Duration);
}
