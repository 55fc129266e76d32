//! Per-entity sync status derived from a [`SyncResult`].
//!
//! The caller persists these records so the UI can show which posts,
//! topics and users are fully synced, failed, or stuck in a conflict.

use serde::Serialize;
use std::collections::HashSet;
use sync_types::{ActionType, ConflictType, OfflineAction, Resolution, SyncResult};

/// The entity a queued action touches, for status bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityContext {
    /// Entity kind (`post`, `user`, `topic`, `topic_membership`, ...).
    pub entity_type: String,
    /// Entity id.
    pub entity_id: String,
}

impl EntityContext {
    /// Resolve the entity an action targets.
    ///
    /// Explicit `entityType`/`entityId` win. Otherwise the type is inferred
    /// from the action kind, and the id falls back through `topicId`,
    /// `postId`, `userId` and finally the action's local id.
    pub fn for_action(action: &OfflineAction) -> Option<Self> {
        let data = &action.action_data;
        let entity_type = non_empty(&data.entity_type)
            .map(str::to_string)
            .or_else(|| infer_entity_type(action.action_type).map(str::to_string))?;
        let entity_id = non_empty(&data.entity_id)
            .or_else(|| non_empty(&data.topic_id))
            .or_else(|| non_empty(&data.post_id))
            .or_else(|| non_empty(&data.user_id))
            .unwrap_or(action.local_id.as_str())
            .to_string();

        Some(Self {
            entity_type,
            entity_id,
        })
    }
}

/// Entity kind implied by an action kind, if any.
pub fn infer_entity_type(action_type: ActionType) -> Option<&'static str> {
    match action_type {
        ActionType::CreatePost
        | ActionType::DeletePost
        | ActionType::LikePost
        | ActionType::Like
        | ActionType::Boost
        | ActionType::Bookmark
        | ActionType::Unbookmark => Some("post"),
        ActionType::Follow | ActionType::Unfollow | ActionType::ProfileUpdate => Some("user"),
        ActionType::JoinTopic | ActionType::LeaveTopic => Some("topic_membership"),
        ActionType::TopicCreate | ActionType::TopicUpdate | ActionType::TopicDelete => {
            Some("topic")
        }
        ActionType::SendDirectMessage => None,
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Sync state of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitySyncStatus {
    /// The action reached the remote system.
    FullySynced,
    /// Applying the action failed.
    Failed,
    /// The action is held back by an unresolved or remote-won conflict.
    Conflict,
}

/// Conflict details carried by a `conflict` status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictDetail {
    /// How the conflict was detected.
    pub conflict_type: ConflictType,
    /// Chosen resolution, if any.
    pub resolution: Option<Resolution>,
}

/// One status record to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityStatusUpdate {
    /// The entity the status applies to.
    #[serde(flatten)]
    pub entity: EntityContext,
    /// New status.
    pub status: EntitySyncStatus,
    /// Present for `conflict` statuses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<ConflictDetail>,
}

/// Derive status records from a sync result.
///
/// Synced actions become `fully_synced`, failed actions `failed`, and
/// conflicts whose action was not synced anyway become `conflict`. Actions
/// with no resolvable entity are skipped.
pub fn status_updates(result: &SyncResult) -> Vec<EntityStatusUpdate> {
    let mut updates = Vec::new();

    for action in &result.synced_actions {
        if let Some(entity) = EntityContext::for_action(action) {
            updates.push(EntityStatusUpdate {
                entity,
                status: EntitySyncStatus::FullySynced,
                conflict: None,
            });
        }
    }

    for action in &result.failed_actions {
        if let Some(entity) = EntityContext::for_action(action) {
            updates.push(EntityStatusUpdate {
                entity,
                status: EntitySyncStatus::Failed,
                conflict: None,
            });
        }
    }

    let synced: HashSet<&str> = result
        .synced_actions
        .iter()
        .map(|action| action.local_id.as_str())
        .collect();

    for conflict in &result.conflicts {
        if synced.contains(conflict.local_action.local_id.as_str()) {
            continue;
        }
        if let Some(entity) = EntityContext::for_action(&conflict.local_action) {
            updates.push(EntityStatusUpdate {
                entity,
                status: EntitySyncStatus::Conflict,
                conflict: Some(ConflictDetail {
                    conflict_type: conflict.conflict_type,
                    resolution: conflict.resolution,
                }),
            });
        }
    }

    updates
}
