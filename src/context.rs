//! Environment access given to tasks and the scheduler each tick.

use serde::{Deserialize, Serialize};

/// A tile position in the game world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldPoint {
    pub x: i32,
    pub y: i32,
    pub plane: i32,
}

impl WorldPoint {
    pub fn new(x: i32, y: i32, plane: i32) -> Self {
        Self { x, y, plane }
    }
}

impl std::fmt::Display for WorldPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.plane)
    }
}

/// Per-tick observation of the controlled character, used for automatic
/// progress detection. A `None` field means the value could not be observed
/// this tick; `animation: None` also covers the idle animation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    pub inventory_digest: Option<u64>,
    pub position: Option<WorldPoint>,
    pub animation: Option<u32>,
}

/// What the execution core can see and do in the surrounding environment.
///
/// Implementations wrap the actual game client. Tasks receive a shared
/// reference each tick, so anything mutable behind this trait uses interior
/// mutability on the implementor's side.
pub trait TaskContext {
    /// Whether the controlled character is currently logged in.
    fn is_logged_in(&self) -> bool;

    /// Whether an external abort of all current work has been requested.
    fn is_abort_requested(&self) -> bool;

    /// Acknowledge a handled abort request.
    fn clear_abort(&self) {}

    /// Observe the character for automatic progress detection.
    fn observe(&self) -> EnvSnapshot {
        EnvSnapshot::default()
    }

    /// Note that the agent acted this tick. Behavioral break activity is
    /// excluded by the scheduler so breaks do not count as productive work.
    fn record_action(&self) {}
}
