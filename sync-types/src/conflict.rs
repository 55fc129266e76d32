//! Conflicts and sync outcomes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::OfflineAction;

/// How a conflict was detected, which decides how it is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictType {
    /// The remote entity changed after the action was queued.
    Timestamp,
    /// Local and remote carry competing version numbers.
    Version,
    /// Resolved by a per-action-kind merge policy.
    Merge,
}

/// Outcome chosen for a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Keep the local action; it is applied.
    Local,
    /// Keep the remote state; the local action is discarded.
    Remote,
    /// Apply a merged form of the action.
    Merge,
    /// Needs the user to decide.
    Manual,
}

impl Resolution {
    /// Whether the local action should be applied under this resolution.
    pub fn applies_local(&self) -> bool {
        matches!(self, Self::Local | Self::Merge)
    }
}

/// A detected disagreement between a local intent and remote state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConflict {
    /// The queued action in question.
    pub local_action: OfflineAction,
    /// The competing remote state, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_action: Option<OfflineAction>,
    /// How the conflict was detected.
    pub conflict_type: ConflictType,
    /// Set once the conflict has been resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    /// Result of a merge resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_data: Option<Value>,
}

impl SyncConflict {
    /// A fresh, unresolved conflict.
    pub fn new(local_action: OfflineAction, conflict_type: ConflictType) -> Self {
        Self {
            local_action,
            remote_action: None,
            conflict_type,
            resolution: None,
            merged_data: None,
        }
    }

    /// Attach the competing remote action.
    pub fn with_remote(mut self, remote_action: OfflineAction) -> Self {
        self.remote_action = Some(remote_action);
        self
    }

    /// Attach merged data.
    pub fn with_merged_data(mut self, merged_data: Value) -> Self {
        self.merged_data = Some(merged_data);
        self
    }

    /// Whether a resolution has been chosen.
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }
}

/// Outcome of one sync invocation.
///
/// `synced_actions.len() + failed_actions.len() <= total_processed`: actions
/// whose conflict resolved toward the remote side are processed but neither
/// synced nor failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    /// Actions that were applied.
    pub synced_actions: Vec<OfflineAction>,
    /// Every detected conflict, with its resolution.
    pub conflicts: Vec<SyncConflict>,
    /// Actions whose application raised an error.
    pub failed_actions: Vec<OfflineAction>,
    /// Number of actions considered.
    pub total_processed: usize,
}

impl SyncResult {
    /// An empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append another result (concatenation, in order).
    pub fn absorb(&mut self, other: SyncResult) {
        self.synced_actions.extend(other.synced_actions);
        self.conflicts.extend(other.conflicts);
        self.failed_actions.extend(other.failed_actions);
        self.total_processed += other.total_processed;
    }

    /// Actions processed but discarded in favour of remote state.
    pub fn discarded(&self) -> usize {
        self.total_processed
            .saturating_sub(self.synced_actions.len() + self.failed_actions.len())
    }
}
