use tracing::debug;

use crate::context::TaskContext;

use super::harness::StepContext;
use super::{StepResult, StepStatus, Task};

/// Predicate over the environment, used by [`ConditionalTask`].
pub type StateCondition = Box<dyn Fn(&dyn TaskContext) -> bool + Send>;

/// Runs child tasks in order. A child failing fails the whole sequence.
pub struct CompositeTask {
    description: String,
    children: Vec<Box<dyn Task>>,
    index: usize,
    child_started: bool,
}

impl CompositeTask {
    pub fn sequential(description: impl Into<String>, children: Vec<Box<dyn Task>>) -> Self {
        Self {
            description: description.into(),
            children,
            index: 0,
            child_started: false,
        }
    }

    pub fn with_child(mut self, child: impl Task + 'static) -> Self {
        self.children.push(Box::new(child));
        self
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Task for CompositeTask {
    fn description(&self) -> &str {
        &self.description
    }

    fn can_execute(&self, ctx: &dyn TaskContext) -> bool {
        self.children
            .first()
            .is_none_or(|child| child.can_execute(ctx))
    }

    fn step(&mut self, ctx: &dyn TaskContext, step: &mut StepContext<'_>) -> StepResult {
        let Some(child) = self.children.get_mut(self.index) else {
            return Ok(StepStatus::Complete);
        };

        // A child's preconditions gate only its start, not every tick.
        if !self.child_started {
            if !child.can_execute(ctx) {
                return Ok(StepStatus::Continue);
            }
            debug!(
                composite = %self.description,
                child = child.description(),
                index = self.index,
                "starting child task"
            );
            self.child_started = true;
        }

        match child.step(ctx, step)? {
            StepStatus::Continue => Ok(StepStatus::Continue),
            StepStatus::Complete => {
                step.record_progress();
                self.index += 1;
                self.child_started = false;
                if self.index >= self.children.len() {
                    Ok(StepStatus::Complete)
                } else {
                    Ok(StepStatus::Continue)
                }
            }
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.child_started = false;
        for child in &mut self.children {
            child.reset();
        }
    }
}

/// Picks between two tasks based on a condition over the environment.
///
/// The condition is evaluated once when the task first steps; with
/// `with_dynamic_evaluation` it is re-evaluated every tick and the active
/// branch switches when the answer changes.
pub struct ConditionalTask {
    description: String,
    condition: StateCondition,
    if_true: Box<dyn Task>,
    if_false: Option<Box<dyn Task>>,
    dynamic: bool,
    selected: Option<bool>,
}

impl ConditionalTask {
    pub fn if_then(
        description: impl Into<String>,
        condition: impl Fn(&dyn TaskContext) -> bool + Send + 'static,
        if_true: impl Task + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            condition: Box::new(condition),
            if_true: Box::new(if_true),
            if_false: None,
            dynamic: false,
            selected: None,
        }
    }

    pub fn or_else(mut self, if_false: impl Task + 'static) -> Self {
        self.if_false = Some(Box::new(if_false));
        self
    }

    pub fn with_dynamic_evaluation(mut self) -> Self {
        self.dynamic = true;
        self
    }
}

impl Task for ConditionalTask {
    fn description(&self) -> &str {
        &self.description
    }

    fn can_execute(&self, _ctx: &dyn TaskContext) -> bool {
        true
    }

    fn step(&mut self, ctx: &dyn TaskContext, step: &mut StepContext<'_>) -> StepResult {
        if self.dynamic || self.selected.is_none() {
            let verdict = (self.condition)(ctx);
            if self.selected != Some(verdict) {
                debug!(task = %self.description, branch = verdict, "condition branch selected");
                self.selected = Some(verdict);
            }
        }

        let branch = match self.selected {
            Some(true) => Some(&mut self.if_true),
            Some(false) => self.if_false.as_mut(),
            None => None,
        };
        match branch {
            Some(task) => task.step(ctx, step),
            // Condition false with no else branch: nothing to do.
            None => Ok(StepStatus::Complete),
        }
    }

    fn reset(&mut self) {
        self.selected = None;
        self.if_true.reset();
        if let Some(task) = self.if_false.as_mut() {
            task.reset();
        }
    }
}
