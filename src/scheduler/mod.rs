pub mod engine;
mod queue;

pub use engine::{IdleTaskSupplier, Scheduler, SchedulerStatus, StuckTaskCallback};
