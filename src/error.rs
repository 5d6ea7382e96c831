use thiserror::Error;

/// Errors surfaced by the scheduler and its configuration layer.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Task queue full (limit: {limit})")]
    QueueFull { limit: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Errors a task step can report. Any of these fails the task for the
/// current attempt; the scheduler decides whether a retry follows.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Precondition lost: {0}")]
    PreconditionLost(String),

    #[error("Environment error: {0}")]
    Environment(String),

    #[error("Interaction failed: {0}")]
    Interaction(String),

    #[error("{0}")]
    Other(String),
}

impl TaskError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
