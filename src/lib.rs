//! Tick-driven execution core for long-running, interruptible agent work.
//!
//! Work is expressed as [`Task`] implementations that do one small step per
//! tick and never block. A [`TaskHarness`] wraps each task with a lifecycle
//! state machine, a dual watchdog (inactivity in ticks plus an absolute wall
//! clock ceiling) and automatic progress detection from environment
//! snapshots. The [`Scheduler`] runs at most one task per tick, preempting
//! lower-priority work through a LIFO pause stack: emergencies first, then
//! behavioral breaks, then regular work.
//!
//! The embedding client drives everything by calling [`Scheduler::on_tick`]
//! with a [`TaskContext`] once per game tick.

pub mod config;
pub mod context;
pub mod error;
pub mod scheduler;
pub mod sources;
pub mod task;

pub use config::SchedulerConfig;
pub use context::{EnvSnapshot, TaskContext, WorldPoint};
pub use error::{Result, SchedulerError, TaskError};
pub use scheduler::{IdleTaskSupplier, Scheduler, SchedulerStatus, StuckTaskCallback};
pub use sources::{
    BehavioralSource, BreakKind, EmergencySource, SOURCE_API_VERSION, ScheduledBreak,
};
pub use task::{
    CompositeTask, ConditionalTask, DEFAULT_MAX_RETRIES, INACTIVITY_TIMEOUT_TICKS,
    MAX_ABSOLUTE_TIMEOUT_SECS, Phase, PhaseTracker, Priority, StateCondition, StateTransition,
    StepContext, StepResult, StepStatus, Task, TaskHarness, TaskState,
};
