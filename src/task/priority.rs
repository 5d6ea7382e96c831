use serde::{Deserialize, Serialize};

/// Scheduling tier of a task. Lower rank runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Emergency response. Never interrupted once running.
    Urgent,
    /// Humanization breaks injected between work.
    Behavioral,
    /// Regular scripted work.
    #[default]
    Normal,
}

impl Priority {
    /// Ordering key for the pending queue.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Urgent => 0,
            Priority::Behavioral => 1,
            Priority::Normal => 2,
        }
    }

    /// Whether a running task at this priority may be preempted.
    pub fn is_interruptible(&self) -> bool {
        !matches!(self, Priority::Urgent)
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Priority::Urgent => "urgent",
            Priority::Behavioral => "behavioral",
            Priority::Normal => "normal",
        };
        write!(f, "{}", s)
    }
}
