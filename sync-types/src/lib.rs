//! # sync-types
//!
//! Data model for the offline differential-sync engine.
//!
//! This crate provides the types shared by every layer of the engine:
//! - [`OfflineAction`], [`ActionType`], [`ActionData`] - locally queued user intents
//! - [`Timestamp`] - queue/remote time basis used for conflict comparison
//! - [`SyncConflict`], [`ConflictType`], [`Resolution`] - detected disagreements
//! - [`SyncResult`] - outcome of one sync invocation
//! - [`DiffPatch`] - shallow key-level change between two snapshots
//!
//! All types serialize with the camelCase field names the local action queue
//! stores them under.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod action;
mod conflict;
mod error;
mod ids;
mod patch;

pub use action::{ActionData, ActionType, EntityType, OfflineAction};
pub use conflict::{ConflictType, Resolution, SyncConflict, SyncResult};
pub use error::{ActionDataError, TimestampError};
pub use ids::{LocalId, Timestamp};
pub use patch::DiffPatch;
