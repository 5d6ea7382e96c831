//! Instrumented tasks and collaborator sources used by the integration
//! tests. Probes expose what a task experienced after the scheduler has
//! consumed it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tickpilot::{
    BehavioralSource, BreakKind, EmergencySource, Priority, ScheduledBreak, StepContext,
    StepResult, StepStatus, Task, TaskContext, TaskError,
};

#[derive(Default)]
struct ProbeState {
    steps: u64,
    completed: bool,
    failure_reasons: Vec<String>,
    resets: u64,
}

/// Shared view into a task's lifecycle, surviving the task's move into the
/// scheduler.
#[derive(Clone, Default)]
pub struct Probe {
    state: Arc<Mutex<ProbeState>>,
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> u64 {
        self.state.lock().unwrap().steps
    }

    pub fn completed(&self) -> bool {
        self.state.lock().unwrap().completed
    }

    pub fn failure_reasons(&self) -> Vec<String> {
        self.state.lock().unwrap().failure_reasons.clone()
    }

    pub fn resets(&self) -> u64 {
        self.state.lock().unwrap().resets
    }
}

/// Completes after a fixed number of steps, reporting everything to its
/// probe. Optionally gated on a shared flag and ordered through a shared
/// completion log.
pub struct CountingTask {
    name: String,
    ticks_to_complete: u64,
    priority: Priority,
    probe: Probe,
    gate: Option<Arc<AtomicBool>>,
    log: Option<Arc<Mutex<Vec<String>>>>,
    records_progress: bool,
}

impl CountingTask {
    pub fn new(name: impl Into<String>, ticks_to_complete: u64) -> Self {
        Self {
            name: name.into(),
            ticks_to_complete,
            priority: Priority::Normal,
            probe: Probe::new(),
            gate: None,
            log: None,
            records_progress: false,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_probe(mut self, probe: &Probe) -> Self {
        self.probe = probe.clone();
        self
    }

    /// Only start once the flag is set.
    pub fn with_gate(mut self, gate: Arc<AtomicBool>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Push the task name onto the log on completion.
    pub fn with_log(mut self, log: Arc<Mutex<Vec<String>>>) -> Self {
        self.log = Some(log);
        self
    }

    /// Record explicit progress every step, defeating the inactivity
    /// watchdog.
    pub fn recording_progress(mut self) -> Self {
        self.records_progress = true;
        self
    }
}

impl Task for CountingTask {
    fn description(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    fn can_execute(&self, _ctx: &dyn TaskContext) -> bool {
        self.gate
            .as_ref()
            .is_none_or(|gate| gate.load(Ordering::SeqCst))
    }

    fn step(&mut self, _ctx: &dyn TaskContext, step: &mut StepContext<'_>) -> StepResult {
        let steps = {
            let mut state = self.probe.state.lock().unwrap();
            state.steps += 1;
            state.steps
        };
        if self.records_progress {
            step.record_progress();
        }
        if steps >= self.ticks_to_complete {
            Ok(StepStatus::Complete)
        } else {
            Ok(StepStatus::Continue)
        }
    }

    fn on_complete(&mut self, _ctx: &dyn TaskContext) {
        self.probe.state.lock().unwrap().completed = true;
        if let Some(log) = &self.log {
            log.lock().unwrap().push(self.name.clone());
        }
    }

    fn on_fail(&mut self, _ctx: &dyn TaskContext, reason: &str) {
        self.probe
            .state
            .lock()
            .unwrap()
            .failure_reasons
            .push(reason.to_string());
    }

    fn reset(&mut self) {
        self.probe.state.lock().unwrap().resets += 1;
    }
}

/// Fails with `TaskError::Other` on its nth step.
pub struct FailingTask {
    name: String,
    fail_on_step: u64,
    probe: Probe,
}

impl FailingTask {
    pub fn new(name: impl Into<String>, fail_on_step: u64) -> Self {
        Self {
            name: name.into(),
            fail_on_step,
            probe: Probe::new(),
        }
    }

    pub fn with_probe(mut self, probe: &Probe) -> Self {
        self.probe = probe.clone();
        self
    }
}

impl Task for FailingTask {
    fn description(&self) -> &str {
        &self.name
    }

    fn can_execute(&self, _ctx: &dyn TaskContext) -> bool {
        true
    }

    fn step(&mut self, _ctx: &dyn TaskContext, _step: &mut StepContext<'_>) -> StepResult {
        let steps = {
            let mut state = self.probe.state.lock().unwrap();
            state.steps += 1;
            state.steps
        };
        if steps >= self.fail_on_step {
            Err(TaskError::other("deliberate failure"))
        } else {
            Ok(StepStatus::Continue)
        }
    }

    fn on_fail(&mut self, _ctx: &dyn TaskContext, reason: &str) {
        self.probe
            .state
            .lock()
            .unwrap()
            .failure_reasons
            .push(reason.to_string());
    }

    fn reset(&mut self) {
        let mut state = self.probe.state.lock().unwrap();
        state.resets += 1;
        state.steps = 0;
    }
}

/// Emergency source fed from the outside.
#[derive(Clone, Default)]
pub struct EmergencyFeed {
    pending: Arc<Mutex<VecDeque<Box<dyn Task>>>>,
}

impl EmergencyFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self, task: impl Task + 'static) {
        self.pending.lock().unwrap().push_back(Box::new(task));
    }
}

impl EmergencySource for EmergencyFeed {
    fn check_emergencies(&mut self, _ctx: &dyn TaskContext) -> Option<Box<dyn Task>> {
        self.pending.lock().unwrap().pop_front()
    }
}

#[derive(Default)]
struct BreakFeedState {
    pending: VecDeque<ScheduledBreak>,
    completed: Vec<(BreakKind, Duration)>,
}

/// Behavioral source fed from the outside, recording break completions.
#[derive(Clone, Default)]
pub struct BreakFeed {
    state: Arc<Mutex<BreakFeedState>>,
}

impl BreakFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&self, kind: BreakKind, task: impl Task + 'static) {
        self.state.lock().unwrap().pending.push_back(ScheduledBreak {
            kind,
            task: Box::new(task),
        });
    }

    pub fn completed(&self) -> Vec<(BreakKind, Duration)> {
        self.state.lock().unwrap().completed.clone()
    }
}

impl BehavioralSource for BreakFeed {
    fn scheduled_break(&mut self) -> Option<ScheduledBreak> {
        self.state.lock().unwrap().pending.pop_front()
    }

    fn on_break_completed(&mut self, kind: BreakKind, actual: Duration) {
        self.state.lock().unwrap().completed.push((kind, actual));
    }
}
