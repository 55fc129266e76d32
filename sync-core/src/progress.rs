//! Progress counters for a running sync.

use serde::Serialize;

/// Snapshot of how far the current (or last) sync has got.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    /// Actions submitted to the sync.
    pub total: usize,
    /// Actions considered so far.
    pub processed: usize,
    /// Actions applied so far.
    pub synced: usize,
    /// Actions that failed so far.
    pub failed: usize,
    /// Conflicts detected so far.
    pub conflicts: usize,
}

impl SyncProgress {
    /// Fresh progress for a batch of `total` actions.
    pub fn starting(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Percentage of actions processed, 0 when there is nothing to do.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.processed as f64 / self.total as f64 * 100.0
        }
    }

    /// Whether every submitted action has been considered.
    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}
