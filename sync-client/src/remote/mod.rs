//! Remote collaborators of the sync engine.
//!
//! The engine never talks to a network itself. Everything it needs from the
//! outside world is expressed as a small async trait, so applications plug in
//! their real services and tests plug in [`MockRemote`].
//!
//! # Design
//!
//! - [`EntityMetadata`] answers "when was this entity last modified remotely?"
//! - [`PostService`] publishes posts and reactions
//! - [`TopicTransport`] joins and leaves topics on the P2P layer
//! - [`TopicSubscriptions`] subscribes to topic traffic on the protocol layer
//!
//! # Example
//!
//! ```ignore
//! let remote = MockRemote::new();
//! let engine = SyncEngine::new(Remote::from_shared(Arc::new(remote.clone())));
//! ```

mod mock;

pub use mock::{MockRemote, RemoteCall};

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use sync_types::{EntityType, Timestamp};
use thiserror::Error;

/// Errors reported by remote collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The remote system refused the request.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The remote system could not be reached.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The request did not complete in time.
    #[error("remote timeout")]
    Timeout,
}

/// Looks up remote modification times of entities.
#[async_trait]
pub trait EntityMetadata: Send + Sync {
    /// Last remote modification time of an entity, if the remote knows it.
    async fn last_modified(
        &self,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Option<Timestamp>, RemoteError>;
}

/// Publishes posts and reactions.
#[async_trait]
pub trait PostService: Send + Sync {
    /// Publish a post into a topic.
    async fn create_post(
        &self,
        content: &str,
        topic_id: &str,
        reply_to: Option<&str>,
        quoted_post: Option<&str>,
    ) -> Result<(), RemoteError>;

    /// Like a post.
    async fn like_post(&self, post_id: &str) -> Result<(), RemoteError>;
}

/// Topic membership on the P2P layer.
#[async_trait]
pub trait TopicTransport: Send + Sync {
    /// Join a topic.
    async fn join_topic(&self, topic_id: &str) -> Result<(), RemoteError>;

    /// Leave a topic.
    async fn leave_topic(&self, topic_id: &str) -> Result<(), RemoteError>;
}

/// Topic subscriptions on the protocol layer.
#[async_trait]
pub trait TopicSubscriptions: Send + Sync {
    /// Start receiving traffic for a topic.
    async fn subscribe_to_topic(&self, topic_id: &str) -> Result<(), RemoteError>;
}

/// The set of collaborators a [`SyncEngine`](crate::SyncEngine) works against.
#[derive(Clone)]
pub struct Remote {
    /// Entity metadata lookups.
    pub metadata: Arc<dyn EntityMetadata>,
    /// Post publishing.
    pub posts: Arc<dyn PostService>,
    /// P2P topic membership.
    pub transport: Arc<dyn TopicTransport>,
    /// Protocol-level topic subscriptions.
    pub subscriptions: Arc<dyn TopicSubscriptions>,
}

impl Remote {
    /// Bundle separate collaborators.
    pub fn new(
        metadata: Arc<dyn EntityMetadata>,
        posts: Arc<dyn PostService>,
        transport: Arc<dyn TopicTransport>,
        subscriptions: Arc<dyn TopicSubscriptions>,
    ) -> Self {
        Self {
            metadata,
            posts,
            transport,
            subscriptions,
        }
    }

    /// Use one object that implements every collaborator trait.
    pub fn from_shared<R>(remote: Arc<R>) -> Self
    where
        R: EntityMetadata + PostService + TopicTransport + TopicSubscriptions + 'static,
    {
        Self {
            metadata: remote.clone(),
            posts: remote.clone(),
            transport: remote.clone(),
            subscriptions: remote,
        }
    }
}

impl fmt::Debug for Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Remote").finish_non_exhaustive()
    }
}
