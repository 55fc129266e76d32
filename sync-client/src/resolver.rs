//! Conflict detection against remote entity metadata.
//!
//! Detection is fail-open: a missing entity reference, an unknown entity
//! kind, a failed lookup or a timed-out lookup all mean "no conflict", and the
//! action proceeds to application.

use crate::remote::{EntityMetadata, RemoteError};
use std::sync::Arc;
use std::time::Duration;
use sync_types::{EntityType, OfflineAction, SyncConflict, Timestamp};
use tracing::{debug, warn};

/// Detects and resolves conflicts for queued actions.
#[derive(Clone)]
pub struct ConflictResolver {
    metadata: Arc<dyn EntityMetadata>,
    lookup_timeout: Option<Duration>,
}

impl ConflictResolver {
    /// Create a resolver backed by the given metadata source.
    pub fn new(metadata: Arc<dyn EntityMetadata>) -> Self {
        Self {
            metadata,
            lookup_timeout: None,
        }
    }

    /// Bound each metadata lookup.
    pub fn with_lookup_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Check whether the entity an action touches changed remotely after the
    /// action was queued.
    pub async fn detect_conflict(&self, action: &OfflineAction) -> Option<SyncConflict> {
        let last_modified = self.entity_last_modified(action).await;
        sync_core::detect_timestamp_conflict(action, last_modified)
    }

    /// Annotate a conflict with its resolution.
    pub fn resolve_conflict(&self, conflict: SyncConflict) -> SyncConflict {
        sync_core::resolve_conflict(conflict)
    }

    async fn entity_last_modified(&self, action: &OfflineAction) -> Option<Timestamp> {
        let data = &action.action_data;
        let entity_type = data.entity_type.as_deref().filter(|t| !t.is_empty())?;
        let entity_id = data.entity_id.as_deref().filter(|id| !id.is_empty())?;

        let entity_type: EntityType = match entity_type.parse() {
            Ok(entity_type) => entity_type,
            Err(unknown) => {
                warn!(
                    local_id = %action.local_id,
                    entity_type = %unknown,
                    "unknown entity type; skipping conflict check"
                );
                return None;
            }
        };

        let lookup = self.metadata.last_modified(entity_type, entity_id);
        let outcome = match self.lookup_timeout {
            Some(limit) => tokio::time::timeout(limit, lookup)
                .await
                .unwrap_or(Err(RemoteError::Timeout)),
            None => lookup.await,
        };

        match outcome {
            Ok(last_modified) => {
                debug!(
                    entity_type = %entity_type,
                    entity_id,
                    last_modified = ?last_modified,
                    "entity metadata"
                );
                last_modified
            }
            Err(e) => {
                warn!(
                    local_id = %action.local_id,
                    entity_type = %entity_type,
                    entity_id,
                    error = %e,
                    "metadata lookup failed; treating as no conflict"
                );
                None
            }
        }
    }
}

impl std::fmt::Debug for ConflictResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConflictResolver")
            .field("lookup_timeout", &self.lookup_timeout)
            .finish_non_exhaustive()
    }
}
