use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Created but not yet started. Preconditions are re-checked each tick.
    #[default]
    Pending,
    Running,
    /// Preempted by a higher-priority task. Resumes from where it left off.
    Paused,
    Completed,
    Failed,
}

impl TaskState {
    pub fn allowed_transitions(&self) -> &'static [TaskState] {
        use TaskState::*;
        match self {
            Pending => &[Running, Failed],
            Running => &[Completed, Failed, Paused],
            Paused => &[Running, Failed],
            Completed => &[],
            Failed => &[],
        }
    }

    pub fn can_transition_to(&self, target: TaskState) -> bool {
        self.allowed_transitions().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, TaskState::Paused)
    }

    pub fn can_resume(&self) -> bool {
        matches!(self, TaskState::Paused)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Paused => "Paused",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: TaskState,
    pub to: TaskState,
    pub reason: String,
    pub at: DateTime<Utc>,
}

impl StateTransition {
    pub fn new(from: TaskState, to: TaskState, reason: impl Into<String>) -> Self {
        Self {
            from,
            to,
            reason: reason.into(),
            at: Utc::now(),
        }
    }
}
