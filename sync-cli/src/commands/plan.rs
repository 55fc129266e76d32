//! Dry-run a queue of offline actions against a recorded remote snapshot.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use sync_client::{status_updates, EngineConfig, MockRemote, Remote, SyncEngine};
use sync_core::EntityStatusUpdate;
use sync_types::{EntityType, OfflineAction, SyncResult, Timestamp};

use super::{print_json, read_json};

/// Recorded remote state to plan against.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteSnapshot {
    /// Known last-modified times.
    pub last_modified: Vec<LastModified>,
    /// Topics whose operations fail.
    pub failing_topics: Vec<String>,
    /// Topics whose subscription fails.
    pub failing_subscriptions: Vec<String>,
    /// Posts whose likes fail.
    pub failing_posts: Vec<String>,
    /// Entities whose metadata lookup fails.
    pub failing_lookups: Vec<String>,
}

/// One row of the last-modified table.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastModified {
    /// Entity kind.
    pub entity_type: EntityType,
    /// Entity id.
    pub entity_id: String,
    /// Remote modification time.
    pub modified_at: Timestamp,
}

impl RemoteSnapshot {
    fn into_mock(self) -> MockRemote {
        let remote = MockRemote::new();
        for row in self.last_modified {
            remote.set_last_modified(row.entity_type, &row.entity_id, row.modified_at);
        }
        for topic in &self.failing_topics {
            remote.fail_topic(topic);
        }
        for topic in &self.failing_subscriptions {
            remote.fail_subscribe(topic);
        }
        for post in &self.failing_posts {
            remote.fail_post(post);
        }
        for entity in &self.failing_lookups {
            remote.fail_lookup(entity);
        }
        remote
    }
}

/// What the plan command prints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// The engine's result.
    pub result: SyncResult,
    /// Status records derived from the result.
    pub status_updates: Vec<EntityStatusUpdate>,
    /// Number of remote operations that would be attempted.
    pub remote_calls: usize,
}

/// Run the plan command.
pub async fn run(
    queue: &Path,
    remote: Option<&Path>,
    config: Option<&Path>,
    checkpoint: Option<&str>,
) -> Result<()> {
    let plan = build_plan(queue, remote, config, checkpoint).await?;
    print_json(&plan)
}

async fn build_plan(
    queue: &Path,
    remote: Option<&Path>,
    config: Option<&Path>,
    checkpoint: Option<&str>,
) -> Result<Plan> {
    let actions: Vec<OfflineAction> = read_json(queue).await?;
    let snapshot: RemoteSnapshot = match remote {
        Some(path) => read_json(path).await?,
        None => RemoteSnapshot::default(),
    };
    let config = match config {
        Some(path) => EngineConfig::from_file(path).context("Failed to load engine config")?,
        None => EngineConfig::default(),
    };

    let mock = snapshot.into_mock();
    let engine = SyncEngine::with_config(Remote::from_shared(Arc::new(mock.clone())), config);
    let result = engine
        .perform_differential_sync(actions, checkpoint)
        .await
        .context("Sync failed")?;

    Ok(Plan {
        status_updates: status_updates(&result),
        remote_calls: mock.calls().len(),
        result,
    })
}
