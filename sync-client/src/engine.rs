//! The differential sync engine.
//!
//! `SyncEngine` takes a batch of locally queued actions, partitions it by
//! topic, and processes each topic group as an independent task. Within a
//! group actions run strictly in queue order through conflict detection,
//! resolution and application. Results are merged in group order.
//!
//! At most one sync runs per engine; a second call while one is in flight
//! fails immediately with [`EngineError::AlreadyRunning`].

use crate::applier::{ActionApplier, ApplyError};
use crate::config::EngineConfig;
use crate::remote::Remote;
use crate::resolver::ConflictResolver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use sync_core::{
    apply_diff_patches, generate_diff_patches, group_by_topic, EngineEvent, EngineState,
    SyncProgress, TopicGroup, Transition,
};
use sync_types::{
    ActionData, DiffPatch, OfflineAction, Resolution, SyncConflict, SyncResult, Timestamp,
};
use thiserror::Error;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Errors from the engine's public operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A sync is already in flight on this engine.
    #[error("sync already in progress")]
    AlreadyRunning,

    /// Applying an action during manual resolution failed.
    #[error("apply failed: {0}")]
    Apply(#[from] ApplyError),
}

/// How a user settles a conflict by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualChoice {
    /// Apply the local action as queued.
    Local,
    /// Apply the remote action, if the conflict carries one.
    Remote,
    /// Apply the local action with the conflict's merged data.
    Merge,
}

/// What a manual resolution did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManualOutcome {
    /// The action that was applied, if any.
    pub applied: Option<OfflineAction>,
    /// Patches from the local data to the merged data (merge only).
    pub patches: Vec<DiffPatch>,
}

/// Offline differential sync engine.
#[derive(Debug)]
pub struct SyncEngine {
    config: EngineConfig,
    resolver: Arc<ConflictResolver>,
    applier: Arc<ActionApplier>,
    state: Mutex<EngineState>,
    progress: Arc<watch::Sender<SyncProgress>>,
}

impl SyncEngine {
    /// Create an engine with the default configuration.
    pub fn new(remote: Remote) -> Self {
        Self::with_config(remote, EngineConfig::default())
    }

    /// Create an engine with the given configuration.
    pub fn with_config(remote: Remote, config: EngineConfig) -> Self {
        let resolver = ConflictResolver::new(remote.metadata.clone())
            .with_lookup_timeout(config.lookup_timeout());
        let applier = ActionApplier::new(remote).with_timeout(config.apply_timeout());
        let (progress, _) = watch::channel(SyncProgress::default());

        Self {
            config,
            resolver: Arc::new(resolver),
            applier: Arc::new(applier),
            state: Mutex::new(EngineState::new()),
            progress: Arc::new(progress),
        }
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Check whether a sync is in flight.
    pub fn is_syncing(&self) -> bool {
        lock(&self.state).is_running()
    }

    /// Watch progress of the current (or last) sync.
    pub fn subscribe_progress(&self) -> watch::Receiver<SyncProgress> {
        self.progress.subscribe()
    }

    /// Sync a batch of locally queued actions.
    ///
    /// Every action ends up in exactly one of `synced_actions`,
    /// `failed_actions`, or (when the remote side won its conflict) only in
    /// `conflicts`. `remote_checkpoint` is accepted for future incremental
    /// fetches and is currently only logged.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyRunning`] if another sync is in flight.
    /// Per-action failures never fail the call.
    pub async fn perform_differential_sync(
        &self,
        local_actions: Vec<OfflineAction>,
        remote_checkpoint: Option<&str>,
    ) -> Result<SyncResult, EngineError> {
        let _guard = SyncGuard::acquire(&self.state, local_actions.len())?;

        info!(
            actions = local_actions.len(),
            remote_checkpoint = ?remote_checkpoint,
            "starting differential sync"
        );
        self.progress
            .send_replace(SyncProgress::starting(local_actions.len()));

        let groups = group_by_topic(local_actions, &self.config.default_group);
        let limiter = (self.config.max_concurrent_groups > 0)
            .then(|| Arc::new(Semaphore::new(self.config.max_concurrent_groups)));

        let mut tasks = GroupTasks::default();
        for group in groups {
            let topic = group.topic.clone();
            let resolver = Arc::clone(&self.resolver);
            let applier = Arc::clone(&self.applier);
            let progress = Arc::clone(&self.progress);
            let limiter = limiter.clone();

            let handle = tokio::spawn(async move {
                // Held until the group finishes. The semaphore is never closed.
                let _permit = match limiter {
                    Some(limiter) => limiter.acquire_owned().await.ok(),
                    None => None,
                };
                sync_topic_group(group, &resolver, &applier, &progress).await
            });
            tasks.push(topic, handle);
        }

        let mut result = SyncResult::new();
        for (topic, handle) in &mut tasks.tasks {
            match handle.await {
                Ok(group_result) => result.absorb(group_result),
                Err(e) => {
                    error!(topic = %topic, error = %e, "topic group task failed");
                }
            }
        }

        info!(
            processed = result.total_processed,
            synced = result.synced_actions.len(),
            failed = result.failed_actions.len(),
            conflicts = result.conflicts.len(),
            "differential sync finished"
        );
        Ok(result)
    }

    /// Settle a conflict by hand and apply the chosen side.
    ///
    /// Runs outside the single-flight guard. The conflict's resolution is
    /// only updated once the chosen action has been applied, so a failed
    /// attempt can be retried.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Apply`] if applying the chosen action fails.
    pub async fn resolve_manually(
        &self,
        conflict: &mut SyncConflict,
        choice: ManualChoice,
    ) -> Result<ManualOutcome, EngineError> {
        let outcome = match choice {
            ManualChoice::Local => {
                self.applier.apply_action(&conflict.local_action).await?;
                ManualOutcome {
                    applied: Some(conflict.local_action.clone()),
                    patches: Vec::new(),
                }
            }
            ManualChoice::Remote => match &conflict.remote_action {
                Some(remote) => {
                    self.applier.apply_action(remote).await?;
                    ManualOutcome {
                        applied: Some(remote.clone()),
                        patches: Vec::new(),
                    }
                }
                None => ManualOutcome::default(),
            },
            ManualChoice::Merge => match &conflict.merged_data {
                Some(merged) => {
                    let local = conflict.local_action.action_data.to_value();
                    let patches = generate_diff_patches(&local, merged);
                    let merged_data = ActionData::from_value(apply_diff_patches(&local, &patches))
                        .map_err(ApplyError::from)?;

                    let mut action = conflict.local_action.clone();
                    action.action_data = merged_data;
                    action.created_at = Timestamp::now();
                    self.applier.apply_action(&action).await?;

                    ManualOutcome {
                        applied: Some(action),
                        patches,
                    }
                }
                None => {
                    warn!(
                        local_id = %conflict.local_action.local_id,
                        "merge chosen but conflict carries no merged data"
                    );
                    ManualOutcome::default()
                }
            },
        };

        conflict.resolution = Some(match choice {
            ManualChoice::Local => Resolution::Local,
            ManualChoice::Remote => Resolution::Remote,
            ManualChoice::Merge => Resolution::Merge,
        });
        Ok(outcome)
    }
}

/// Process one topic group in queue order.
async fn sync_topic_group(
    group: TopicGroup,
    resolver: &ConflictResolver,
    applier: &ActionApplier,
    progress: &watch::Sender<SyncProgress>,
) -> SyncResult {
    debug!(topic = %group.topic, actions = group.actions.len(), "syncing topic group");
    let mut result = SyncResult::new();

    for action in group.actions {
        result.total_processed += 1;

        let conflict = resolver.detect_conflict(&action).await;
        let conflicted = conflict.is_some();
        let outcome = settle_action(action, conflict, resolver, applier, &mut result).await;

        progress.send_modify(|p| {
            p.processed += 1;
            match outcome {
                ActionOutcome::Synced => p.synced += 1,
                ActionOutcome::Failed => p.failed += 1,
                ActionOutcome::Discarded => {}
            }
            if conflicted {
                p.conflicts += 1;
            }
        });
    }

    result
}

/// Where one action ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionOutcome {
    /// Applied; listed in `synced_actions`.
    Synced,
    /// Application failed; listed in `failed_actions`.
    Failed,
    /// The remote side won its conflict; listed only in `conflicts`.
    Discarded,
}

/// Resolve the action's conflict, if any, then apply the action unless the
/// remote side won. Records everything in `result`.
async fn settle_action(
    action: OfflineAction,
    conflict: Option<SyncConflict>,
    resolver: &ConflictResolver,
    applier: &ActionApplier,
    result: &mut SyncResult,
) -> ActionOutcome {
    if let Some(conflict) = conflict {
        let resolved = resolver.resolve_conflict(conflict);
        let applies = resolved.resolution.is_some_and(|r| r.applies_local());
        result.conflicts.push(resolved);
        if !applies {
            info!(local_id = %action.local_id, "remote state wins; action discarded");
            return ActionOutcome::Discarded;
        }
    }

    match applier.apply_action(&action).await {
        Ok(()) => {
            result.synced_actions.push(action);
            ActionOutcome::Synced
        }
        Err(e) => {
            error!(
                local_id = %action.local_id,
                action_type = %action.action_type,
                error = %e,
                "failed to apply action"
            );
            result.failed_actions.push(action);
            ActionOutcome::Failed
        }
    }
}

fn lock(state: &Mutex<EngineState>) -> MutexGuard<'_, EngineState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds the single-flight guard; releases it on drop, including on error
/// and cancellation.
struct SyncGuard<'a> {
    state: &'a Mutex<EngineState>,
}

impl<'a> SyncGuard<'a> {
    fn acquire(state: &'a Mutex<EngineState>, batch_size: usize) -> Result<Self, EngineError> {
        let mut current = lock(state);
        let (next, transition) = current.on_event(EngineEvent::SyncRequested { batch_size });
        *current = next;

        match transition {
            Transition::Started => Ok(Self { state }),
            _ => {
                warn!("sync requested while another sync is in progress");
                Err(EngineError::AlreadyRunning)
            }
        }
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        let mut current = lock(self.state);
        let (next, _) = current.on_event(EngineEvent::SyncFinished);
        *current = next;
    }
}

/// Spawned group tasks. Dropping this requests abort of every unfinished
/// task; a task mid-poll on another worker still completes that poll, so a
/// remote call already under way may land after the guard is released.
#[derive(Default)]
struct GroupTasks {
    tasks: Vec<(String, JoinHandle<SyncResult>)>,
}

impl GroupTasks {
    fn push(&mut self, topic: String, handle: JoinHandle<SyncResult>) {
        self.tasks.push((topic, handle));
    }
}

impl Drop for GroupTasks {
    fn drop(&mut self) {
        for (_, handle) in &self.tasks {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MockRemote, RemoteCall};
    use serde_json::json;
    use sync_types::{ActionType, ConflictType, EntityType};

    const QUEUED_AT: i64 = 1_700_000_000_000;

    fn engine(remote: &MockRemote) -> SyncEngine {
        SyncEngine::new(Remote::from_shared(Arc::new(remote.clone())))
    }

    fn post(local_id: &str, content: &str, topic: &str) -> OfflineAction {
        OfflineAction::new("user123", ActionType::CreatePost, ActionData::post(content, topic))
            .with_local_id(local_id)
            .with_created_at(Timestamp::from_millis(QUEUED_AT))
    }

    fn membership(local_id: &str, kind: ActionType, topic: &str) -> OfflineAction {
        OfflineAction::new(
            "user123",
            kind,
            ActionData::for_topic(topic).with_entity("topic", topic),
        )
        .with_local_id(local_id)
        .with_created_at(Timestamp::from_millis(QUEUED_AT))
    }

    fn local_ids(actions: &[OfflineAction]) -> Vec<&str> {
        actions.iter().map(|a| a.local_id.as_str()).collect()
    }

    // ===========================================
    // Differential Sync Tests
    // ===========================================

    #[tokio::test]
    async fn empty_batch_returns_empty_result() {
        let remote = MockRemote::new();

        let result = engine(&remote)
            .perform_differential_sync(Vec::new(), None)
            .await
            .unwrap();

        assert_eq!(result, SyncResult::new());
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn actions_within_a_topic_apply_in_queue_order() {
        let remote = MockRemote::new();
        let actions = vec![post("a", "first", "t1"), post("b", "second", "t1")];

        let result = engine(&remote)
            .perform_differential_sync(actions, Some("checkpoint-1"))
            .await
            .unwrap();

        assert_eq!(local_ids(&result.synced_actions), ["a", "b"]);
        let contents: Vec<_> = remote
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                RemoteCall::CreatePost { content, .. } => Some(content),
                _ => None,
            })
            .collect();
        assert_eq!(contents, ["first", "second"]);
    }

    #[tokio::test]
    async fn results_follow_topic_first_appearance() {
        let remote = MockRemote::new();
        let actions = vec![
            post("a", "x", "t2"),
            post("b", "x", "t1"),
            post("c", "x", "t2"),
        ];

        let result = engine(&remote)
            .perform_differential_sync(actions, None)
            .await
            .unwrap();

        assert_eq!(local_ids(&result.synced_actions), ["a", "c", "b"]);
        assert_eq!(result.total_processed, 3);
    }

    #[tokio::test]
    async fn detected_conflict_without_remote_action_applies_local() {
        let remote = MockRemote::new();
        remote.set_last_modified(EntityType::Topic, "t1", Timestamp::from_millis(QUEUED_AT + 1));

        let result = engine(&remote)
            .perform_differential_sync(vec![membership("j", ActionType::JoinTopic, "t1")], None)
            .await
            .unwrap();

        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.conflicts[0].resolution, Some(Resolution::Local));
        assert_eq!(local_ids(&result.synced_actions), ["j"]);
        assert_eq!(result.discarded(), 0);
    }

    #[tokio::test]
    async fn conflict_is_recorded_even_when_apply_fails() {
        let remote = MockRemote::new();
        remote.set_last_modified(EntityType::Topic, "t1", Timestamp::from_millis(QUEUED_AT + 1));
        remote.fail_topic("t1");

        let result = engine(&remote)
            .perform_differential_sync(vec![membership("j", ActionType::JoinTopic, "t1")], None)
            .await
            .unwrap();

        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.conflicts[0].conflict_type, ConflictType::Timestamp);
        assert_eq!(local_ids(&result.failed_actions), ["j"]);
        assert!(result.synced_actions.is_empty());
    }

    #[tokio::test]
    async fn unsupported_action_fails_without_aborting_batch() {
        let remote = MockRemote::new();
        let follow = OfflineAction::new("user123", ActionType::Follow, ActionData::default())
            .with_local_id("f");

        let result = engine(&remote)
            .perform_differential_sync(vec![follow, post("p", "hi", "t1")], None)
            .await
            .unwrap();

        assert_eq!(local_ids(&result.failed_actions), ["f"]);
        assert_eq!(local_ids(&result.synced_actions), ["p"]);
        assert_eq!(result.total_processed, 2);
    }

    #[tokio::test]
    async fn bounded_concurrency_still_processes_every_group() {
        let remote = MockRemote::new();
        let engine = SyncEngine::with_config(
            Remote::from_shared(Arc::new(remote.clone())),
            EngineConfig::default().with_max_concurrent_groups(1),
        );
        let actions = vec![post("a", "x", "t1"), post("b", "x", "t2"), post("c", "x", "t3")];

        let result = engine.perform_differential_sync(actions, None).await.unwrap();

        assert_eq!(local_ids(&result.synced_actions), ["a", "b", "c"]);
    }

    // ===========================================
    // Settle Action Tests
    // ===========================================

    fn newer_remote(topic: &str) -> OfflineAction {
        membership("r", ActionType::LeaveTopic, topic)
            .with_created_at(Timestamp::from_millis(QUEUED_AT + 5))
    }

    #[tokio::test]
    async fn remote_won_conflict_is_discarded() {
        let remote = MockRemote::new();
        let engine = engine(&remote);
        let action = membership("j", ActionType::JoinTopic, "t1");
        let conflict =
            SyncConflict::new(action.clone(), ConflictType::Timestamp).with_remote(newer_remote("t1"));
        let mut result = SyncResult::new();
        result.total_processed = 1;

        let outcome = settle_action(
            action,
            Some(conflict),
            &engine.resolver,
            &engine.applier,
            &mut result,
        )
        .await;

        assert_eq!(outcome, ActionOutcome::Discarded);
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.conflicts[0].resolution, Some(Resolution::Remote));
        assert!(result.synced_actions.is_empty());
        assert!(result.failed_actions.is_empty());
        assert_eq!(result.discarded(), 1);
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn local_won_conflict_is_applied_and_reported() {
        let remote = MockRemote::new();
        let engine = engine(&remote);
        let action = membership("j", ActionType::JoinTopic, "t1")
            .with_created_at(Timestamp::from_millis(QUEUED_AT + 10));
        let conflict =
            SyncConflict::new(action.clone(), ConflictType::Timestamp).with_remote(newer_remote("t1"));
        let mut result = SyncResult::new();

        let outcome = settle_action(
            action,
            Some(conflict),
            &engine.resolver,
            &engine.applier,
            &mut result,
        )
        .await;

        assert_eq!(outcome, ActionOutcome::Synced);
        assert_eq!(result.conflicts[0].resolution, Some(Resolution::Local));
        assert_eq!(local_ids(&result.synced_actions), ["j"]);
    }

    #[tokio::test]
    async fn action_without_conflict_failing_to_apply_is_failed() {
        let remote = MockRemote::new();
        remote.fail_topic("t1");
        let engine = engine(&remote);
        let mut result = SyncResult::new();

        let outcome = settle_action(
            post("p", "x", "t1"),
            None,
            &engine.resolver,
            &engine.applier,
            &mut result,
        )
        .await;

        assert_eq!(outcome, ActionOutcome::Failed);
        assert!(result.conflicts.is_empty());
        assert_eq!(local_ids(&result.failed_actions), ["p"]);
    }

    // ===========================================
    // Single-Flight Tests
    // ===========================================

    #[tokio::test]
    async fn guard_is_released_after_sync() {
        let remote = MockRemote::new();
        let engine = engine(&remote);

        engine
            .perform_differential_sync(vec![post("a", "x", "t1")], None)
            .await
            .unwrap();
        assert!(!engine.is_syncing());

        // A second, sequential sync is allowed.
        engine
            .perform_differential_sync(vec![post("b", "x", "t1")], None)
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_sync_is_rejected() {
        let remote = MockRemote::new();
        remote.set_apply_latency(std::time::Duration::from_secs(1));
        let engine = engine(&remote);

        let (first, second) = tokio::join!(
            engine.perform_differential_sync(vec![post("a", "x", "t1")], None),
            engine.perform_differential_sync(vec![post("b", "x", "t1")], None),
        );

        assert_eq!(local_ids(&first.unwrap().synced_actions), ["a"]);
        assert!(matches!(second, Err(EngineError::AlreadyRunning)));
        assert!(!engine.is_syncing());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_sync_releases_guard() {
        let remote = MockRemote::new();
        remote.set_apply_latency(std::time::Duration::from_secs(60));
        let engine = engine(&remote);

        let sync = engine.perform_differential_sync(vec![post("a", "x", "t1")], None);
        let timed_out = tokio::time::timeout(std::time::Duration::from_secs(1), sync).await;

        assert!(timed_out.is_err());
        assert!(!engine.is_syncing());
    }

    // ===========================================
    // Progress Tests
    // ===========================================

    #[tokio::test]
    async fn progress_reflects_finished_sync() {
        let remote = MockRemote::new();
        remote.fail_topic("t2");
        let engine = engine(&remote);
        let progress = engine.subscribe_progress();

        engine
            .perform_differential_sync(vec![post("a", "x", "t1"), post("b", "x", "t2")], None)
            .await
            .unwrap();

        let snapshot = *progress.borrow();
        assert_eq!(
            snapshot,
            SyncProgress {
                total: 2,
                processed: 2,
                synced: 1,
                failed: 1,
                conflicts: 0,
            }
        );
        assert!(snapshot.is_complete());
    }

    // ===========================================
    // Manual Resolution Tests
    // ===========================================

    #[tokio::test]
    async fn manual_local_applies_local_action() {
        let remote = MockRemote::new();
        let mut conflict = SyncConflict::new(post("a", "mine", "t1"), ConflictType::Timestamp);

        let outcome = engine(&remote)
            .resolve_manually(&mut conflict, ManualChoice::Local)
            .await
            .unwrap();

        assert_eq!(conflict.resolution, Some(Resolution::Local));
        assert_eq!(outcome.applied.map(|a| a.local_id), Some("a".into()));
        assert_eq!(remote.calls().len(), 1);
    }

    #[tokio::test]
    async fn manual_remote_without_remote_action_only_marks() {
        let remote = MockRemote::new();
        let mut conflict = SyncConflict::new(post("a", "mine", "t1"), ConflictType::Timestamp);

        let outcome = engine(&remote)
            .resolve_manually(&mut conflict, ManualChoice::Remote)
            .await
            .unwrap();

        assert_eq!(conflict.resolution, Some(Resolution::Remote));
        assert_eq!(outcome, ManualOutcome::default());
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn manual_merge_applies_merged_data() {
        let remote = MockRemote::new();
        let mut conflict = SyncConflict::new(post("a", "mine", "t1"), ConflictType::Merge)
            .with_merged_data(json!({ "content": "mine + theirs", "topicId": "t1" }));

        let outcome = engine(&remote)
            .resolve_manually(&mut conflict, ManualChoice::Merge)
            .await
            .unwrap();

        assert_eq!(conflict.resolution, Some(Resolution::Merge));
        assert_eq!(outcome.patches.len(), 1);
        assert_eq!(outcome.patches[0].path(), "content");
        assert_eq!(
            remote.calls(),
            vec![RemoteCall::CreatePost {
                content: "mine + theirs".into(),
                topic_id: "t1".into(),
                reply_to: None,
                quoted_post: None,
            }]
        );
    }

    #[tokio::test]
    async fn failed_manual_apply_leaves_conflict_unresolved() {
        let remote = MockRemote::new();
        remote.fail_topic("t1");
        let mut conflict = SyncConflict::new(post("a", "mine", "t1"), ConflictType::Timestamp);

        let result = engine(&remote)
            .resolve_manually(&mut conflict, ManualChoice::Local)
            .await;

        assert!(matches!(result, Err(EngineError::Apply(_))));
        assert_eq!(conflict.resolution, None);
    }
}
