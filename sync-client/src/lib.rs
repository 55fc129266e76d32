//! # sync-client
//!
//! Async offline differential-sync engine.
//!
//! Applications queue user actions while offline and hand the queue to a
//! [`SyncEngine`] when connectivity returns. The engine reconciles each
//! action against remote state and reports what was synced, what failed and
//! which conflicts were found.
//!
//! ## Features
//!
//! - **Topic-parallel**: independent topics sync concurrently, actions within
//!   a topic stay in queue order
//! - **Fail-open conflict detection**: metadata lookup problems never block a sync
//! - **Single-flight**: one sync per engine at a time
//! - **Pluggable remote**: collaborator traits with a [`MockRemote`] for tests
//! - **Pure core**: grouping, conflict rules and diffing live in sync-core
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sync_client::{MockRemote, Remote, SyncEngine};
//!
//! let engine = SyncEngine::new(Remote::from_shared(Arc::new(MockRemote::new())));
//! let result = engine.perform_differential_sync(queued_actions, None).await?;
//! println!("synced {}", result.synced_actions.len());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod applier;
pub mod config;
pub mod engine;
pub mod remote;
pub mod resolver;

pub use applier::{ActionApplier, ApplyError, RemoteOperation};
pub use config::{ConfigError, EngineConfig};
pub use engine::{EngineError, ManualChoice, ManualOutcome, SyncEngine};
pub use remote::{
    EntityMetadata, MockRemote, PostService, Remote, RemoteCall, RemoteError, TopicSubscriptions,
    TopicTransport,
};
pub use resolver::ConflictResolver;

// The diff helpers are part of the engine surface.
pub use sync_core::{apply_diff_patches, generate_diff_patches, status_updates, SyncProgress};
