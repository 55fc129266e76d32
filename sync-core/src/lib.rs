//! # sync-core
//!
//! Pure logic for the offline differential-sync engine (no I/O, instant tests).
//!
//! This crate implements the algorithms of the engine without touching any
//! remote system, so every rule can be unit tested synchronously.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects:
//! - [`diff`] computes and applies shallow key-level patches
//! - [`conflict`] compares queue times and settles conflicts
//! - [`group`] partitions a queue into independent topic groups
//! - [`state`] is the single-flight state machine
//! - [`status`] derives per-entity status records from a result
//! - [`progress`] counts how far a sync has got
//!
//! The actual I/O (metadata lookups, applying actions) is performed by
//! `sync-client`, which drives these functions.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod conflict;
pub mod diff;
pub mod group;
pub mod progress;
pub mod state;
pub mod status;

pub use conflict::{
    apply_merge_policy, detect_timestamp_conflict, resolve_conflict, resolve_lww,
    resolve_version, MergePolicy,
};
pub use diff::{apply_diff_patches, generate_diff_patches};
pub use group::{group_by_topic, TopicGroup, DEFAULT_GROUP};
pub use progress::SyncProgress;
pub use state::{EngineEvent, EngineState, Transition};
pub use status::{
    infer_entity_type, status_updates, ConflictDetail, EntityContext, EntityStatusUpdate,
    EntitySyncStatus,
};
