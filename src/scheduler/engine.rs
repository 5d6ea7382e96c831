use serde::Serialize;
use tracing::{debug, error, info, trace, warn};

use crate::config::SchedulerConfig;
use crate::context::TaskContext;
use crate::error::{Result, SchedulerError};
use crate::sources::{BehavioralSource, EmergencySource, ScheduledBreak};
use crate::task::{Priority, Task, TaskHarness, TaskState};

use super::queue::PendingQueue;

/// Produces a task to run when the queue is empty and nothing is paused.
pub type IdleTaskSupplier = Box<dyn FnMut() -> Option<Box<dyn Task>> + Send>;

/// Invoked when the active task is about to be failed by its watchdog.
pub type StuckTaskCallback = Box<dyn FnMut(&TaskHarness) + Send>;

/// Single-threaded, tick-driven task scheduler.
///
/// Everything happens inside [`Scheduler::on_tick`], which the embedding
/// client calls once per game tick. At most one task runs at a time;
/// higher-priority work preempts it through a LIFO pause stack so nested
/// interruptions unwind in reverse order.
pub struct Scheduler {
    config: SchedulerConfig,
    enabled: bool,
    ticks: u64,
    current: Option<TaskHarness>,
    pending: PendingQueue,
    pause_stack: Vec<TaskHarness>,
    current_step_complete: bool,
    retry_ready_at: Option<u64>,
    emergencies: Option<Box<dyn EmergencySource>>,
    breaks: Option<Box<dyn BehavioralSource>>,
    idle_supplier: Option<IdleTaskSupplier>,
    on_stuck: Option<StuckTaskCallback>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            enabled: false,
            ticks: 0,
            current: None,
            pending: PendingQueue::new(),
            pause_stack: Vec::new(),
            current_step_complete: false,
            retry_ready_at: None,
            emergencies: None,
            breaks: None,
            idle_supplier: None,
            on_stuck: None,
        }
    }

    pub fn set_emergency_source(&mut self, source: impl EmergencySource + 'static) {
        self.emergencies = Some(Box::new(source));
    }

    pub fn set_behavioral_source(&mut self, source: impl BehavioralSource + 'static) {
        self.breaks = Some(Box::new(source));
    }

    pub fn set_idle_task_supplier(&mut self, supplier: IdleTaskSupplier) {
        self.idle_supplier = Some(supplier);
    }

    pub fn set_stuck_callback(&mut self, callback: StuckTaskCallback) {
        self.on_stuck = Some(callback);
    }

    pub fn start(&mut self) {
        info!("scheduler started");
        self.enabled = true;
    }

    /// Disable the scheduler, aborting whatever is currently running.
    /// Queued and paused tasks stay where they are.
    pub fn stop(&mut self) {
        info!("scheduler stopping");
        self.enabled = false;
        self.abort_current_task();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn current_task(&self) -> Option<&TaskHarness> {
        self.current.as_ref()
    }

    pub fn queue_size(&self) -> usize {
        self.pending.len()
    }

    pub fn has_pending_tasks(&self) -> bool {
        !self.pending.is_empty() || self.current.is_some() || !self.pause_stack.is_empty()
    }

    pub fn pause_depth(&self) -> usize {
        self.pause_stack.len()
    }

    pub fn clear_queue(&mut self) -> usize {
        let removed = self.pending.clear();
        if removed > 0 {
            info!(removed, "pending queue cleared");
        }
        removed
    }

    /// Signal that the active task is at a safe boundary, meaning a
    /// behavioral break may be injected before its next step. Cleared
    /// automatically each time a task steps.
    pub fn set_current_step_complete(&mut self, complete: bool) {
        self.current_step_complete = complete;
    }

    pub fn current_step_complete(&self) -> bool {
        self.current_step_complete
    }

    /// Queue a task at the priority it declares for itself.
    pub fn queue_task(&mut self, task: impl Task + 'static) -> Result<()> {
        let harness = TaskHarness::new(task).with_absolute_timeout(self.config.absolute_timeout());
        self.enqueue(harness)
    }

    /// Queue a task at an explicit priority, overriding its own.
    pub fn queue_task_with_priority(
        &mut self,
        task: impl Task + 'static,
        priority: Priority,
    ) -> Result<()> {
        let harness = TaskHarness::new(task)
            .with_priority(priority)
            .with_absolute_timeout(self.config.absolute_timeout());
        self.enqueue(harness)
    }

    /// Queue a pre-built harness, keeping whatever limits it carries.
    pub fn queue_harness(&mut self, harness: TaskHarness) -> Result<()> {
        self.enqueue(harness)
    }

    /// Abort the active task without retry. Any paused task underneath
    /// resumes on the next tick.
    pub fn abort_current_task(&mut self) {
        self.fail_current_for_abort(None);
    }

    /// Run one scheduling round. Called once per game tick.
    pub fn on_tick(&mut self, ctx: &dyn TaskContext) {
        if !self.enabled {
            return;
        }
        self.ticks += 1;

        // A global abort consumes the whole tick. Whatever was paused
        // underneath resumes on the next one.
        if ctx.is_abort_requested() {
            debug!("abort requested via context");
            self.fail_current_for_abort(Some(ctx));
            ctx.clear_abort();
            return;
        }

        self.settle_current(ctx);
        self.check_emergencies(ctx);
        if self.current_step_complete {
            self.check_scheduled_breaks();
        }

        if self.current.is_none() {
            self.current = self.next_task();
        }

        let executed = match self.current.as_mut() {
            Some(current) => {
                if current.is_timed_out()
                    && let Some(callback) = self.on_stuck.as_mut()
                {
                    callback(current);
                }
                self.current_step_complete = false;
                current.execute(ctx);
                if current.priority() != Priority::Behavioral {
                    ctx.record_action();
                }
                true
            }
            None => false,
        };
        if executed {
            self.settle_current(ctx);
        }
    }

    /// Snapshot of the scheduler for status surfaces.
    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            enabled: self.enabled,
            tick: self.ticks,
            current: self.current.as_ref().map(|c| c.description().to_string()),
            current_state: self.current.as_ref().map(|c| c.state()),
            queue_size: self.pending.len(),
            pause_depth: self.pause_stack.len(),
        }
    }

    fn enqueue(&mut self, harness: TaskHarness) -> Result<()> {
        if self.pending.len() >= self.config.max_queue_size {
            error!(
                task = harness.description(),
                limit = self.config.max_queue_size,
                "task queue full, rejecting task"
            );
            return Err(SchedulerError::QueueFull {
                limit: self.config.max_queue_size,
            });
        }
        debug!(
            task = harness.description(),
            priority = %harness.priority(),
            queued = self.pending.len() + 1,
            "task queued"
        );
        self.pending.push(harness);
        Ok(())
    }

    /// Remove the active task if it reached a terminal state, run its
    /// hooks, arrange a retry on failure and resume the most recently
    /// paused task.
    fn settle_current(&mut self, ctx: &dyn TaskContext) {
        let Some(mut done) = self
            .current
            .take_if(|current| current.state().is_terminal())
        else {
            return;
        };

        match done.state() {
            TaskState::Completed => {
                info!(
                    task = done.description(),
                    ticks = done.execution_ticks(),
                    elapsed_ms = done.execution_duration().as_millis() as u64,
                    "task completed"
                );
                done.notify_complete(ctx);
                if let Some(kind) = done.break_kind()
                    && let Some(source) = self.breaks.as_mut()
                {
                    source.on_break_completed(kind, done.execution_duration());
                }
            }
            TaskState::Failed => {
                done.notify_fail(ctx);
                if done.can_retry() && !done.is_aborted() {
                    done.begin_retry();
                    let backoff = self.backoff_ticks(done.attempts());
                    self.retry_ready_at = Some(self.ticks + backoff);
                    info!(
                        task = done.description(),
                        attempt = done.attempts(),
                        max_retries = done.max_retries(),
                        backoff_ticks = backoff,
                        "task failed, scheduling retry"
                    );
                    if let Err(e) = self.enqueue(done) {
                        warn!(error = %e, "dropping retry, queue full");
                    }
                } else {
                    warn!(
                        task = done.description(),
                        attempts = done.attempts(),
                        reason = done.failure_reason().unwrap_or("unknown"),
                        "task failed permanently"
                    );
                }
            }
            _ => {}
        }

        self.current_step_complete = true;
        if let Some(resumed) = self.pause_stack.pop() {
            debug!(
                task = resumed.description(),
                depth = self.pause_stack.len(),
                "resuming most recently paused task"
            );
            self.current = Some(resumed);
        }
    }

    fn check_emergencies(&mut self, ctx: &dyn TaskContext) {
        let Some(source) = self.emergencies.as_mut() else {
            return;
        };
        let Some(task) = source.check_emergencies(ctx) else {
            return;
        };
        let harness = TaskHarness::from_boxed(task)
            .with_priority(Priority::Urgent)
            .with_absolute_timeout(self.config.absolute_timeout());
        warn!(task = harness.description(), "emergency task raised");

        match self.current.as_ref().map(|c| c.priority()) {
            Some(priority) if !priority.is_interruptible() => {
                debug!("urgent task already active, queueing emergency behind it");
                if let Err(e) = self.enqueue(harness) {
                    error!(error = %e, "failed to queue emergency task");
                }
            }
            Some(Priority::Behavioral) => {
                // A break is never worth finishing during an emergency.
                // The pause stack is left alone so completing the urgent
                // task resumes whatever the break had preempted.
                if let Some(mut dropped) = self.current.take() {
                    warn!(
                        task = dropped.description(),
                        "abandoning behavioral task for emergency"
                    );
                    dropped.fail("abandoned for emergency response");
                    dropped.notify_fail(ctx);
                }
                self.current = Some(harness);
            }
            Some(_) => {
                self.push_paused();
                self.current = Some(harness);
            }
            None => {
                self.current = Some(harness);
            }
        }
    }

    fn check_scheduled_breaks(&mut self) {
        let Some(source) = self.breaks.as_mut() else {
            return;
        };
        if self.pending.contains_priority(Priority::Behavioral) {
            return;
        }
        let Some(ScheduledBreak { kind, task }) = source.scheduled_break() else {
            return;
        };
        let harness = TaskHarness::from_boxed(task)
            .with_priority(Priority::Behavioral)
            .with_break_kind(kind)
            .with_absolute_timeout(self.config.absolute_timeout());
        debug!(task = harness.description(), kind = %kind, "behavioral break scheduled");

        match self.current.as_ref().map(|c| c.priority()) {
            Some(priority) if !priority.is_interruptible() => {
                if let Err(e) = self.enqueue(harness) {
                    error!(error = %e, "failed to queue behavioral task");
                }
            }
            Some(_) => {
                self.push_paused();
                self.current = Some(harness);
            }
            None => {
                self.current = Some(harness);
            }
        }
    }

    /// Move the active task out of the way for a preempting one.
    fn push_paused(&mut self) {
        let Some(mut current) = self.current.take() else {
            return;
        };
        match current.state() {
            TaskState::Running => {
                current.pause();
                debug!(
                    task = current.description(),
                    depth = self.pause_stack.len() + 1,
                    "pausing current task"
                );
                self.pause_stack.push(current);
            }
            // Popped off the stack this tick but not yet resumed.
            TaskState::Paused => {
                self.pause_stack.push(current);
            }
            // Never started, no state worth keeping on the stack.
            TaskState::Pending => {
                self.pending.push(current);
            }
            _ => {}
        }
    }

    fn next_task(&mut self) -> Option<TaskHarness> {
        if let Some(ready_at) = self.retry_ready_at {
            if self.ticks < ready_at {
                trace!(ready_at, tick = self.ticks, "retry backoff in effect");
                return None;
            }
            self.retry_ready_at = None;
        }
        if let Some(next) = self.pending.pop() {
            debug!(
                task = next.description(),
                priority = %next.priority(),
                "starting next queued task"
            );
            return Some(next);
        }
        if let Some(supplier) = self.idle_supplier.as_mut()
            && let Some(task) = supplier()
        {
            trace!("queue empty, running idle task");
            return Some(
                TaskHarness::from_boxed(task).with_absolute_timeout(self.config.absolute_timeout()),
            );
        }
        None
    }

    fn fail_current_for_abort(&mut self, ctx: Option<&dyn TaskContext>) {
        let Some(mut current) = self.current.take() else {
            return;
        };
        info!(task = current.description(), "aborting current task");
        current.abort();
        if let Some(ctx) = ctx {
            current.notify_fail(ctx);
        }
        self.current_step_complete = true;
        if let Some(resumed) = self.pause_stack.pop() {
            debug!(
                task = resumed.description(),
                depth = self.pause_stack.len(),
                "resuming most recently paused task"
            );
            self.current = Some(resumed);
        }
    }

    fn backoff_ticks(&self, attempt: u32) -> u64 {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay = self.config.base_retry_delay_ticks as f64
            * self.config.retry_backoff_multiplier.powi(exponent);
        delay.round() as u64
    }
}

/// Read-only view of the scheduler's state.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub enabled: bool,
    pub tick: u64,
    pub current: Option<String>,
    pub current_state: Option<TaskState>,
    pub queue_size: usize,
    pub pause_depth: usize,
}

impl std::fmt::Display for SchedulerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Scheduler[enabled={}, tick={}, current={}, queue={}, paused={}]",
            self.enabled,
            self.tick,
            self.current.as_deref().unwrap_or("none"),
            self.queue_size,
            self.pause_depth
        )
    }
}
