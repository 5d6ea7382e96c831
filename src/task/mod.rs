//! Task model: the `Task` trait, its lifecycle state machine and the
//! harness that drives a task one step per tick.

pub mod composite;
pub mod harness;
pub mod phase;
pub mod priority;
pub mod progress;
pub mod state;

pub use composite::{CompositeTask, ConditionalTask, StateCondition};
pub use harness::{StepContext, TaskHarness};
pub use phase::{Phase, PhaseTracker};
pub use priority::Priority;
pub use state::{StateTransition, TaskState};

use crate::context::TaskContext;
use crate::error::TaskError;

/// Ticks without progress before the watchdog fails a task (about one
/// minute at the 0.6s game tick).
pub const INACTIVITY_TIMEOUT_TICKS: u64 = 100;

/// Wall clock ceiling for a single task attempt. Catches tasks that keep
/// producing incidental progress without ever finishing.
pub const MAX_ABSOLUTE_TIMEOUT_SECS: u64 = 30 * 60;

/// Retry budget applied when a task does not override it.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Outcome of a single task step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// More work remains. The task will be stepped again next tick.
    Continue,
    Complete,
}

pub type StepResult = std::result::Result<StepStatus, TaskError>;

/// A unit of agent work driven one step per tick.
///
/// `step` must never block. A task waiting on the environment returns
/// `StepStatus::Continue` and checks again next tick; the harness around it
/// handles state, watchdogs and progress tracking. Failures are returned as
/// `TaskError`, never panicked.
pub trait Task: Send {
    /// Human-readable description used in logs and status output.
    fn description(&self) -> &str;

    /// Scheduling tier. Read once when the task enters a harness.
    fn priority(&self) -> Priority {
        Priority::Normal
    }

    /// Whether the task is ready to start. Re-checked every tick while the
    /// task is pending; returning false just waits, it is not a failure.
    fn can_execute(&self, ctx: &dyn TaskContext) -> bool;

    /// Perform one tick of work.
    fn step(&mut self, ctx: &dyn TaskContext, step: &mut StepContext<'_>) -> StepResult;

    /// Called once when the task completes.
    fn on_complete(&mut self, _ctx: &dyn TaskContext) {}

    /// Called once per failed attempt with the failure reason.
    fn on_fail(&mut self, _ctx: &dyn TaskContext, _reason: &str) {}

    /// Clear internal state before a retry attempt.
    fn reset(&mut self) {}

    fn inactivity_timeout_ticks(&self) -> u64 {
        INACTIVITY_TIMEOUT_TICKS
    }

    fn max_retries(&self) -> u32 {
        DEFAULT_MAX_RETRIES
    }
}
