//! Scriptable `TaskContext` for driving the scheduler in tests.

use std::cell::Cell;

use tickpilot::{EnvSnapshot, TaskContext, WorldPoint};

pub struct TestContext {
    logged_in: Cell<bool>,
    abort_requested: Cell<bool>,
    snapshot: Cell<EnvSnapshot>,
    actions: Cell<u64>,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            logged_in: Cell::new(true),
            abort_requested: Cell::new(false),
            snapshot: Cell::new(EnvSnapshot::default()),
            actions: Cell::new(0),
        }
    }

    pub fn set_logged_in(&self, logged_in: bool) {
        self.logged_in.set(logged_in);
    }

    pub fn request_abort(&self) {
        self.abort_requested.set(true);
    }

    pub fn set_snapshot(&self, snapshot: EnvSnapshot) {
        self.snapshot.set(snapshot);
    }

    pub fn set_position(&self, x: i32, y: i32) {
        let mut snapshot = self.snapshot.get();
        snapshot.position = Some(WorldPoint::new(x, y, 0));
        self.snapshot.set(snapshot);
    }

    pub fn actions(&self) -> u64 {
        self.actions.get()
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskContext for TestContext {
    fn is_logged_in(&self) -> bool {
        self.logged_in.get()
    }

    fn is_abort_requested(&self) -> bool {
        self.abort_requested.get()
    }

    fn clear_abort(&self) {
        self.abort_requested.set(false);
    }

    fn observe(&self) -> EnvSnapshot {
        self.snapshot.get()
    }

    fn record_action(&self) {
        self.actions.set(self.actions.get() + 1);
    }
}
