use tracing::trace;

use crate::context::{EnvSnapshot, WorldPoint};

/// Detects progress from environment observations without task cooperation.
///
/// A change in inventory, position or animation counts as progress, but only
/// when the previous value of that field was actually observed. The first
/// observation of any field establishes a baseline and never counts.
/// Animation changes additionally require both the previous and current
/// animation to be real, so idle flicker does not keep a dead task alive.
#[derive(Debug, Clone, Default)]
pub struct SnapshotTracker {
    inventory_digest: Option<u64>,
    position: Option<WorldPoint>,
    animation: Option<u32>,
}

impl SnapshotTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in this tick's observation. Returns true if it shows progress.
    pub fn observe(&mut self, snapshot: &EnvSnapshot) -> bool {
        let mut progressed = false;

        if let (Some(prev), Some(cur)) = (self.inventory_digest, snapshot.inventory_digest)
            && prev != cur
        {
            trace!("inventory changed");
            progressed = true;
        }
        if let (Some(prev), Some(cur)) = (self.position, snapshot.position)
            && prev != cur
        {
            trace!(from = %prev, to = %cur, "position changed");
            progressed = true;
        }
        if let (Some(prev), Some(cur)) = (self.animation, snapshot.animation)
            && prev != cur
        {
            trace!(from = prev, to = cur, "animation changed");
            progressed = true;
        }

        if snapshot.inventory_digest.is_some() {
            self.inventory_digest = snapshot.inventory_digest;
        }
        if snapshot.position.is_some() {
            self.position = snapshot.position;
        }
        self.animation = snapshot.animation;

        progressed
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}
