use chrono::{DateTime, Utc};
use tracing::{debug, error, trace, warn};

use crate::context::TaskContext;
use crate::sources::BreakKind;

use super::phase::{Phase, PhaseTracker};
use super::priority::Priority;
use super::progress::SnapshotTracker;
use super::state::{StateTransition, TaskState};
use super::{MAX_ABSOLUTE_TIMEOUT_SECS, StepStatus, Task};

pub(crate) const ABORT_REASON: &str = "aborted externally";

/// Owns a task and drives it through its lifecycle one tick at a time.
///
/// The harness holds everything that is not task-specific: the state
/// machine, tick counters, the dual watchdog, phase tracking, automatic
/// progress detection and the retry bookkeeping. Tasks only implement the
/// actual work.
pub struct TaskHarness {
    task: Box<dyn Task>,
    state: TaskState,
    priority: Priority,
    execution_ticks: u64,
    last_progress_tick: u64,
    inactivity_timeout_ticks: u64,
    absolute_timeout: std::time::Duration,
    max_retries: u32,
    attempts: u32,
    started_at: Option<DateTime<Utc>>,
    aborted: bool,
    failure_reason: Option<String>,
    progress: Option<f64>,
    phase: PhaseTracker,
    snapshots: SnapshotTracker,
    transitions: Vec<StateTransition>,
    break_kind: Option<BreakKind>,
}

impl TaskHarness {
    pub fn new(task: impl Task + 'static) -> Self {
        Self::from_boxed(Box::new(task))
    }

    pub fn from_boxed(task: Box<dyn Task>) -> Self {
        let priority = task.priority();
        let inactivity_timeout_ticks = task.inactivity_timeout_ticks();
        let max_retries = task.max_retries();
        Self {
            task,
            state: TaskState::Pending,
            priority,
            execution_ticks: 0,
            last_progress_tick: 0,
            inactivity_timeout_ticks,
            absolute_timeout: std::time::Duration::from_secs(MAX_ABSOLUTE_TIMEOUT_SECS),
            max_retries,
            attempts: 0,
            started_at: None,
            aborted: false,
            failure_reason: None,
            progress: None,
            phase: PhaseTracker::new(),
            snapshots: SnapshotTracker::new(),
            transitions: Vec::new(),
            break_kind: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_inactivity_timeout_ticks(mut self, ticks: u64) -> Self {
        self.inactivity_timeout_ticks = ticks;
        self
    }

    pub fn with_absolute_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.absolute_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub(crate) fn with_break_kind(mut self, kind: BreakKind) -> Self {
        self.break_kind = Some(kind);
        self
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn is_interruptible(&self) -> bool {
        self.priority.is_interruptible()
    }

    pub fn description(&self) -> &str {
        self.task.description()
    }

    pub fn execution_ticks(&self) -> u64 {
        self.execution_ticks
    }

    pub fn last_progress_tick(&self) -> u64 {
        self.last_progress_tick
    }

    pub fn ticks_since_progress(&self) -> u64 {
        self.execution_ticks - self.last_progress_tick
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Wall clock time since the task first started running. Survives
    /// pauses, resets on retry.
    pub fn execution_duration(&self) -> std::time::Duration {
        self.started_at
            .map(|at| (Utc::now() - at).to_std().unwrap_or_default())
            .unwrap_or_default()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_retries
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Fractional progress reported by the task, if it reports any.
    pub fn progress(&self) -> Option<f64> {
        self.progress
    }

    pub fn phase(&self) -> &'static str {
        self.phase.label()
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    pub(crate) fn break_kind(&self) -> Option<BreakKind> {
        self.break_kind
    }

    pub fn is_timed_out(&self) -> bool {
        self.watchdog_verdict().is_some()
    }

    /// Run one tick of the task lifecycle.
    ///
    /// Order matters: abort wins over everything, preconditions gate the
    /// start, the watchdog is evaluated before the tick that would follow
    /// it, and only then does the task itself get to run.
    pub fn execute(&mut self, ctx: &dyn TaskContext) {
        if self.aborted {
            self.fail(ABORT_REASON);
            return;
        }

        if self.state == TaskState::Pending {
            if !self.task.can_execute(ctx) {
                trace!(task = self.task.description(), "preconditions not met, waiting");
                return;
            }
            debug!(
                task = self.task.description(),
                priority = %self.priority,
                inactivity_timeout = self.inactivity_timeout_ticks,
                max_retries = self.max_retries,
                "task starting"
            );
            self.transition_to(TaskState::Running, "preconditions met");
        }

        if self.state == TaskState::Paused {
            self.transition_to(TaskState::Running, "resumed");
        }

        if self.state != TaskState::Running {
            return;
        }

        if let Some(reason) = self.watchdog_verdict() {
            self.fail(&reason);
            return;
        }

        self.execution_ticks += 1;
        self.phase.tick();

        if self.snapshots.observe(&ctx.observe()) {
            self.last_progress_tick = self.execution_ticks;
        }

        let mut progressed = false;
        let status = {
            let mut step = StepContext::new(
                &mut self.phase,
                &mut self.progress,
                &mut progressed,
                self.execution_ticks,
            );
            self.task.step(ctx, &mut step)
        };
        if progressed {
            self.last_progress_tick = self.execution_ticks;
        }

        match status {
            Ok(StepStatus::Continue) => {}
            Ok(StepStatus::Complete) => self.complete(),
            Err(e) => {
                error!(task = self.task.description(), error = %e, "task step failed");
                self.fail(&e.to_string());
            }
        }
    }

    /// Request that the task stop at the next opportunity. Takes effect
    /// immediately from the harness's point of view.
    pub fn abort(&mut self) {
        self.aborted = true;
        self.fail(ABORT_REASON);
    }

    /// Preempt a running task. No-op (with a warning) in any other state.
    pub fn pause(&mut self) {
        self.transition_to(TaskState::Paused, "preempted");
    }

    pub(crate) fn fail(&mut self, reason: &str) {
        if self.transition_to(TaskState::Failed, reason) {
            warn!(
                task = self.task.description(),
                reason,
                ticks = self.execution_ticks,
                "task failed"
            );
            self.failure_reason = Some(reason.to_string());
        }
    }

    fn complete(&mut self) {
        if self.transition_to(TaskState::Completed, "finished") {
            debug!(
                task = self.task.description(),
                ticks = self.execution_ticks,
                "task completed"
            );
        }
    }

    pub(crate) fn notify_complete(&mut self, ctx: &dyn TaskContext) {
        self.task.on_complete(ctx);
    }

    pub(crate) fn notify_fail(&mut self, ctx: &dyn TaskContext) {
        let reason = self
            .failure_reason
            .clone()
            .unwrap_or_else(|| "unknown failure".to_string());
        self.task.on_fail(ctx, &reason);
    }

    /// Wipe all transient execution state so the next attempt starts from a
    /// blank slate. Configuration and the attempt counter are kept.
    pub fn reset_for_retry(&mut self) {
        debug!(
            task = self.task.description(),
            attempts = self.attempts,
            "resetting task for retry"
        );
        self.state = TaskState::Pending;
        self.execution_ticks = 0;
        self.last_progress_tick = 0;
        self.started_at = None;
        self.aborted = false;
        self.failure_reason = None;
        self.progress = None;
        self.phase.reset();
        self.snapshots.reset();
        self.transitions.clear();
        self.task.reset();
    }

    pub(crate) fn begin_retry(&mut self) {
        self.attempts += 1;
        self.reset_for_retry();
    }

    fn transition_to(&mut self, to: TaskState, reason: &str) -> bool {
        let from = self.state;
        if !from.can_transition_to(to) {
            warn!(
                task = self.task.description(),
                %from,
                %to,
                "invalid state transition rejected"
            );
            return false;
        }
        self.state = to;
        if to == TaskState::Running && self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        self.transitions.push(StateTransition::new(from, to, reason));
        true
    }

    fn watchdog_verdict(&self) -> Option<String> {
        self.started_at?;
        let since = self.ticks_since_progress();
        if since > self.inactivity_timeout_ticks {
            return Some(format!(
                "no progress for {} ticks (limit: {})",
                since, self.inactivity_timeout_ticks
            ));
        }
        let elapsed = self.execution_duration();
        if elapsed > self.absolute_timeout {
            return Some(format!(
                "running for {}s, absolute ceiling is {}s",
                elapsed.as_secs(),
                self.absolute_timeout.as_secs()
            ));
        }
        None
    }
}

impl std::fmt::Debug for TaskHarness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHarness")
            .field("task", &self.task.description())
            .field("state", &self.state)
            .field("priority", &self.priority)
            .field("execution_ticks", &self.execution_ticks)
            .field("attempts", &self.attempts)
            .finish()
    }
}

/// Per-tick view handed to `Task::step` for progress and phase reporting.
pub struct StepContext<'a> {
    phase: &'a mut PhaseTracker,
    progress: &'a mut Option<f64>,
    progressed: &'a mut bool,
    execution_ticks: u64,
}

impl<'a> StepContext<'a> {
    pub(crate) fn new(
        phase: &'a mut PhaseTracker,
        progress: &'a mut Option<f64>,
        progressed: &'a mut bool,
        execution_ticks: u64,
    ) -> Self {
        Self {
            phase,
            progress,
            progressed,
            execution_ticks,
        }
    }

    /// Mark this tick as having made progress, resetting the inactivity
    /// watchdog. For work the automatic detection cannot see.
    pub fn record_progress(&mut self) {
        *self.progressed = true;
    }

    /// Enter a phase. An actual phase change counts as progress.
    pub fn enter_phase<P: Phase>(&mut self, phase: P) {
        if self.phase.enter(phase, self.execution_ticks) {
            *self.progressed = true;
        }
    }

    pub fn phase(&self) -> &'static str {
        self.phase.label()
    }

    /// Ticks spent waiting in the current phase.
    pub fn phase_wait_ticks(&self) -> u64 {
        self.phase.wait_ticks()
    }

    pub fn has_phase_waited(&self, ticks: u64) -> bool {
        self.phase.has_waited(ticks)
    }

    pub fn execution_ticks(&self) -> u64 {
        self.execution_ticks
    }

    /// Report fractional completion, clamped to `0.0..=1.0`.
    pub fn report_progress(&mut self, fraction: f64) {
        *self.progress = Some(fraction.clamp(0.0, 1.0));
    }
}
