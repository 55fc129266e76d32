//! Conflict detection and resolution rules.
//!
//! Detection here is the pure comparison step; looking up the remote
//! entity's last-modified time is sync-client's job. Resolution is
//! deterministic and only annotates the conflict.

use sync_types::{ActionType, ConflictType, OfflineAction, Resolution, SyncConflict, Timestamp};

/// How a merge-type conflict is settled for a given action kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// The later write supersedes the earlier one.
    LastWriteWins,
    /// The local action is always kept.
    KeepLocal,
}

impl MergePolicy {
    /// The merge policy for an action kind.
    ///
    /// Topic membership is superseded, not merged. Duplicate posts are an
    /// accepted cost of concurrent authorship, and likes are safe to replay,
    /// so both keep the local action.
    pub fn for_action(action_type: ActionType) -> Self {
        match action_type {
            ActionType::JoinTopic | ActionType::LeaveTopic => Self::LastWriteWins,
            ActionType::CreatePost | ActionType::LikePost => Self::KeepLocal,
            ActionType::DeletePost
            | ActionType::Like
            | ActionType::Boost
            | ActionType::Bookmark
            | ActionType::Unbookmark
            | ActionType::Follow
            | ActionType::Unfollow
            | ActionType::ProfileUpdate
            | ActionType::TopicCreate
            | ActionType::TopicUpdate
            | ActionType::TopicDelete
            | ActionType::SendDirectMessage => Self::LastWriteWins,
        }
    }
}

/// Compare an action against its entity's remote last-modified time.
///
/// Returns a `timestamp` conflict only when the entity was modified strictly
/// after the action was queued. No known modification time means no
/// conflict.
pub fn detect_timestamp_conflict(
    action: &OfflineAction,
    last_modified: Option<Timestamp>,
) -> Option<SyncConflict> {
    let last_modified = last_modified?;
    (last_modified > action.created_at)
        .then(|| SyncConflict::new(action.clone(), ConflictType::Timestamp))
}

/// Resolve a conflict according to its type, returning it annotated.
pub fn resolve_conflict(mut conflict: SyncConflict) -> SyncConflict {
    match conflict.conflict_type {
        ConflictType::Timestamp => resolve_lww(&mut conflict),
        ConflictType::Version => resolve_version(&mut conflict),
        ConflictType::Merge => apply_merge_policy(&mut conflict),
    };
    conflict
}

/// Last-Write-Wins: local wins unless the remote action is strictly newer.
///
/// A missing remote action counts as written at the epoch.
pub fn resolve_lww(conflict: &mut SyncConflict) -> Resolution {
    let local = conflict.local_action.created_at;
    let remote = conflict
        .remote_action
        .as_ref()
        .map_or(Timestamp::EPOCH, |remote| remote.created_at);

    let resolution = if local >= remote {
        Resolution::Local
    } else {
        Resolution::Remote
    };
    conflict.resolution = Some(resolution);
    resolution
}

/// Higher `version` wins; local wins ties. Missing versions count as 0.
pub fn resolve_version(conflict: &mut SyncConflict) -> Resolution {
    let local = conflict.local_action.action_data.version.unwrap_or(0);
    let remote = conflict
        .remote_action
        .as_ref()
        .and_then(|remote| remote.action_data.version)
        .unwrap_or(0);

    let resolution = if local >= remote {
        Resolution::Local
    } else {
        Resolution::Remote
    };
    conflict.resolution = Some(resolution);
    resolution
}

/// Settle a merge-type conflict with the action kind's [`MergePolicy`].
pub fn apply_merge_policy(conflict: &mut SyncConflict) -> Resolution {
    match MergePolicy::for_action(conflict.local_action.action_type) {
        MergePolicy::LastWriteWins => resolve_lww(conflict),
        MergePolicy::KeepLocal => {
            conflict.resolution = Some(Resolution::Local);
            Resolution::Local
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_types::ActionData;

    fn action_at(action_type: ActionType, created_at: &str) -> OfflineAction {
        OfflineAction::new("user123", action_type, ActionData::for_topic("topic1"))
            .with_local_id("local_123")
            .with_created_at(created_at.parse().unwrap())
    }

    fn remote_at(action_type: ActionType, created_at: &str) -> OfflineAction {
        let mut remote = action_at(action_type, created_at).with_local_id("remote_123");
        remote.is_synced = true;
        remote
    }

    // ===========================================
    // Detection
    // ===========================================

    #[test]
    fn no_last_modified_means_no_conflict() {
        let action = action_at(ActionType::CreatePost, "2024-01-01T00:00:00Z");
        assert!(detect_timestamp_conflict(&action, None).is_none());
    }

    #[test]
    fn older_entity_means_no_conflict() {
        let action = action_at(ActionType::LikePost, "2024-01-02T00:00:00Z");
        let older = "2024-01-01T23:59:59Z".parse().ok();
        assert!(detect_timestamp_conflict(&action, older).is_none());
    }

    #[test]
    fn equal_times_mean_no_conflict() {
        let action = action_at(ActionType::LikePost, "2024-01-02T00:00:00Z");
        assert!(detect_timestamp_conflict(&action, Some(action.created_at)).is_none());
    }

    #[test]
    fn newer_entity_is_timestamp_conflict() {
        let action = action_at(ActionType::LikePost, "2024-01-01T00:00:00Z");
        let newer = "2024-01-02T00:00:00Z".parse().ok();
        let conflict = detect_timestamp_conflict(&action, newer).unwrap();
        assert_eq!(conflict.conflict_type, ConflictType::Timestamp);
        assert_eq!(conflict.local_action, action);
        assert!(!conflict.is_resolved());
    }

    // ===========================================
    // Last-Write-Wins
    // ===========================================

    #[test]
    fn lww_local_newer_wins() {
        let mut conflict = SyncConflict::new(
            action_at(ActionType::CreatePost, "2024-01-02T00:00:00Z"),
            ConflictType::Timestamp,
        )
        .with_remote(remote_at(ActionType::CreatePost, "2024-01-01T00:00:00Z"));

        assert_eq!(resolve_lww(&mut conflict), Resolution::Local);
        assert_eq!(conflict.resolution, Some(Resolution::Local));
    }

    #[test]
    fn lww_tie_goes_to_local() {
        let mut conflict = SyncConflict::new(
            action_at(ActionType::CreatePost, "2024-01-01T00:00:00Z"),
            ConflictType::Timestamp,
        )
        .with_remote(remote_at(ActionType::CreatePost, "2024-01-01T00:00:00Z"));

        assert_eq!(resolve_lww(&mut conflict), Resolution::Local);
    }

    #[test]
    fn lww_remote_newer_wins() {
        let mut conflict = SyncConflict::new(
            action_at(ActionType::CreatePost, "2024-01-01T00:00:00Z"),
            ConflictType::Timestamp,
        )
        .with_remote(remote_at(ActionType::CreatePost, "2024-01-02T00:00:00Z"));

        assert_eq!(resolve_lww(&mut conflict), Resolution::Remote);
    }

    #[test]
    fn lww_without_remote_treats_remote_as_epoch() {
        let mut conflict = SyncConflict::new(
            action_at(ActionType::LikePost, "2024-01-01T00:00:00Z"),
            ConflictType::Timestamp,
        );
        assert_eq!(resolve_lww(&mut conflict), Resolution::Local);
    }

    #[test]
    fn lww_is_idempotent() {
        let mut conflict = SyncConflict::new(
            action_at(ActionType::CreatePost, "2024-01-01T00:00:00Z"),
            ConflictType::Timestamp,
        )
        .with_remote(remote_at(ActionType::CreatePost, "2024-01-03T00:00:00Z"));

        let first = resolve_lww(&mut conflict);
        let second = resolve_lww(&mut conflict);
        assert_eq!(first, second);
        assert_eq!(conflict.resolution, Some(first));
    }

    // ===========================================
    // Version
    // ===========================================

    #[test]
    fn version_higher_local_wins() {
        let mut local = action_at(ActionType::ProfileUpdate, "2024-01-01T00:00:00Z");
        local.action_data.version = Some(3);
        let mut remote = remote_at(ActionType::ProfileUpdate, "2024-01-05T00:00:00Z");
        remote.action_data.version = Some(2);
        let conflict = SyncConflict::new(local, ConflictType::Version).with_remote(remote);

        assert_eq!(
            resolve_conflict(conflict).resolution,
            Some(Resolution::Local)
        );
    }

    #[test]
    fn version_higher_remote_wins() {
        let local = action_at(ActionType::ProfileUpdate, "2024-01-05T00:00:00Z");
        let mut remote = remote_at(ActionType::ProfileUpdate, "2024-01-01T00:00:00Z");
        remote.action_data.version = Some(1);
        let conflict = SyncConflict::new(local, ConflictType::Version).with_remote(remote);

        assert_eq!(
            resolve_conflict(conflict).resolution,
            Some(Resolution::Remote)
        );
    }

    #[test]
    fn version_tie_and_missing_go_to_local() {
        let conflict = SyncConflict::new(
            action_at(ActionType::ProfileUpdate, "2024-01-01T00:00:00Z"),
            ConflictType::Version,
        );
        assert_eq!(
            resolve_conflict(conflict).resolution,
            Some(Resolution::Local)
        );
    }

    // ===========================================
    // Merge policies
    // ===========================================

    #[test]
    fn merge_create_post_always_local() {
        let conflict = SyncConflict::new(
            action_at(ActionType::CreatePost, "2024-01-01T00:00:00Z"),
            ConflictType::Merge,
        )
        .with_remote(remote_at(ActionType::CreatePost, "2030-01-01T00:00:00Z"));

        assert_eq!(
            resolve_conflict(conflict).resolution,
            Some(Resolution::Local)
        );
    }

    #[test]
    fn merge_like_post_always_local() {
        let conflict = SyncConflict::new(
            action_at(ActionType::LikePost, "2024-01-01T00:00:00Z"),
            ConflictType::Merge,
        )
        .with_remote(remote_at(ActionType::LikePost, "2030-01-01T00:00:00Z"));

        assert_eq!(
            resolve_conflict(conflict).resolution,
            Some(Resolution::Local)
        );
    }

    #[test]
    fn merge_membership_local_wins_when_newer_or_equal() {
        for kind in [ActionType::JoinTopic, ActionType::LeaveTopic] {
            let newer = SyncConflict::new(
                action_at(kind, "2024-01-02T00:00:00Z"),
                ConflictType::Merge,
            )
            .with_remote(remote_at(kind, "2024-01-01T00:00:00Z"));
            assert_eq!(resolve_conflict(newer).resolution, Some(Resolution::Local));

            let equal = SyncConflict::new(
                action_at(kind, "2024-01-01T00:00:00Z"),
                ConflictType::Merge,
            )
            .with_remote(remote_at(kind, "2024-01-01T00:00:00Z"));
            assert_eq!(resolve_conflict(equal).resolution, Some(Resolution::Local));
        }
    }

    #[test]
    fn merge_membership_remote_wins_when_strictly_newer() {
        for kind in [ActionType::JoinTopic, ActionType::LeaveTopic] {
            let conflict = SyncConflict::new(
                action_at(kind, "2024-01-01T00:00:00Z"),
                ConflictType::Merge,
            )
            .with_remote(remote_at(kind, "2024-01-02T00:00:00Z"));
            assert_eq!(
                resolve_conflict(conflict).resolution,
                Some(Resolution::Remote)
            );
        }
    }

    #[test]
    fn merge_other_kinds_fall_back_to_lww() {
        let conflict = SyncConflict::new(
            action_at(ActionType::Follow, "2024-01-01T00:00:00Z"),
            ConflictType::Merge,
        )
        .with_remote(remote_at(ActionType::Follow, "2024-01-02T00:00:00Z"));

        assert_eq!(
            resolve_conflict(conflict).resolution,
            Some(Resolution::Remote)
        );
        assert_eq!(
            MergePolicy::for_action(ActionType::DeletePost),
            MergePolicy::LastWriteWins
        );
    }
}
