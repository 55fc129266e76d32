//! Mock remote for testing.
//!
//! Records every call, serves configured last-modified times, and can be told
//! to fail, stall, or panic on specific topics and posts.

use super::{EntityMetadata, PostService, RemoteError, TopicSubscriptions, TopicTransport};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use sync_types::{EntityType, Timestamp};

/// A call made against the mock, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    /// `PostService::create_post`
    CreatePost {
        /// Post body.
        content: String,
        /// Target topic.
        topic_id: String,
        /// Parent post, for replies.
        reply_to: Option<String>,
        /// Quoted post.
        quoted_post: Option<String>,
    },
    /// `PostService::like_post`
    LikePost {
        /// Liked post.
        post_id: String,
    },
    /// `TopicTransport::join_topic`
    JoinTopic {
        /// Joined topic.
        topic_id: String,
    },
    /// `TopicTransport::leave_topic`
    LeaveTopic {
        /// Left topic.
        topic_id: String,
    },
    /// `TopicSubscriptions::subscribe_to_topic`
    SubscribeToTopic {
        /// Subscribed topic.
        topic_id: String,
    },
}

/// Mock remote for testing.
///
/// Clones share state, so a test keeps one handle for assertions and hands
/// another to the engine.
#[derive(Debug, Default)]
pub struct MockRemote {
    inner: Arc<Mutex<MockRemoteInner>>,
}

#[derive(Debug, Default)]
struct MockRemoteInner {
    calls: Vec<RemoteCall>,
    lookups: Vec<(EntityType, String)>,
    last_modified: HashMap<(EntityType, String), Timestamp>,
    failing_lookups: HashSet<String>,
    failing_topics: HashSet<String>,
    failing_subscriptions: HashSet<String>,
    failing_posts: HashSet<String>,
    panicking_topics: HashSet<String>,
    fail_next_apply: Option<String>,
    apply_latency: Option<Duration>,
    lookup_latency: Option<Duration>,
}

impl MockRemote {
    /// Create a new mock remote.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockRemoteInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Report `modified_at` as the entity's last remote modification.
    pub fn set_last_modified(&self, entity_type: EntityType, entity_id: &str, modified_at: Timestamp) {
        let mut inner = self.lock();
        inner
            .last_modified
            .insert((entity_type, entity_id.to_string()), modified_at);
    }

    /// Make every metadata lookup for `entity_id` fail.
    pub fn fail_lookup(&self, entity_id: &str) {
        let mut inner = self.lock();
        inner.failing_lookups.insert(entity_id.to_string());
    }

    /// Make every operation targeting `topic_id` fail.
    pub fn fail_topic(&self, topic_id: &str) {
        let mut inner = self.lock();
        inner.failing_topics.insert(topic_id.to_string());
    }

    /// Make only the protocol-level subscription to `topic_id` fail.
    pub fn fail_subscribe(&self, topic_id: &str) {
        let mut inner = self.lock();
        inner.failing_subscriptions.insert(topic_id.to_string());
    }

    /// Make likes of `post_id` fail.
    pub fn fail_post(&self, post_id: &str) {
        let mut inner = self.lock();
        inner.failing_posts.insert(post_id.to_string());
    }

    /// Panic inside any operation targeting `topic_id`.
    pub fn panic_on_topic(&self, topic_id: &str) {
        let mut inner = self.lock();
        inner.panicking_topics.insert(topic_id.to_string());
    }

    /// Cause the next apply operation to fail with the given error.
    pub fn fail_next_apply(&self, error: &str) {
        let mut inner = self.lock();
        inner.fail_next_apply = Some(error.to_string());
    }

    /// Delay every apply operation.
    pub fn set_apply_latency(&self, latency: Duration) {
        let mut inner = self.lock();
        inner.apply_latency = Some(latency);
    }

    /// Delay every metadata lookup.
    pub fn set_lookup_latency(&self, latency: Duration) {
        let mut inner = self.lock();
        inner.lookup_latency = Some(latency);
    }

    /// Get all apply calls that were made.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    /// Get all metadata lookups that were made.
    pub fn lookups(&self) -> Vec<(EntityType, String)> {
        self.lock().lookups.clone()
    }

    /// Clear all state (calls, metadata, injected failures).
    pub fn reset(&self) {
        let mut inner = self.lock();
        *inner = MockRemoteInner::default();
    }

    /// Record an apply call and decide its outcome.
    ///
    /// The lock is released before sleeping or panicking.
    async fn record(&self, call: RemoteCall, topic_id: Option<&str>) -> Result<(), RemoteError> {
        let (latency, outcome, panics) = {
            let mut inner = self.lock();
            inner.calls.push(call.clone());

            let panics = topic_id.is_some_and(|t| inner.panicking_topics.contains(t));
            let outcome = if let Some(error) = inner.fail_next_apply.take() {
                Err(RemoteError::Unavailable(error))
            } else {
                inner.check(&call)
            };
            (inner.apply_latency, outcome, panics)
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if panics {
            panic!("mock remote panicked on {call:?}");
        }
        outcome
    }
}

impl MockRemoteInner {
    fn check(&self, call: &RemoteCall) -> Result<(), RemoteError> {
        match call {
            RemoteCall::CreatePost { topic_id, .. }
            | RemoteCall::JoinTopic { topic_id }
            | RemoteCall::LeaveTopic { topic_id }
                if self.failing_topics.contains(topic_id) =>
            {
                Err(RemoteError::Rejected(format!("topic {topic_id} unavailable")))
            }
            RemoteCall::SubscribeToTopic { topic_id }
                if self.failing_topics.contains(topic_id)
                    || self.failing_subscriptions.contains(topic_id) =>
            {
                Err(RemoteError::Rejected(format!(
                    "subscription to {topic_id} refused"
                )))
            }
            RemoteCall::LikePost { post_id } if self.failing_posts.contains(post_id) => {
                Err(RemoteError::Rejected(format!("post {post_id} unavailable")))
            }
            _ => Ok(()),
        }
    }
}

impl Clone for MockRemote {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl EntityMetadata for MockRemote {
    async fn last_modified(
        &self,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Option<Timestamp>, RemoteError> {
        let (latency, outcome) = {
            let mut inner = self.lock();
            inner.lookups.push((entity_type, entity_id.to_string()));

            let outcome = if inner.failing_lookups.contains(entity_id) {
                Err(RemoteError::Unavailable(format!(
                    "metadata for {entity_id} unavailable"
                )))
            } else {
                Ok(inner
                    .last_modified
                    .get(&(entity_type, entity_id.to_string()))
                    .copied())
            };
            (inner.lookup_latency, outcome)
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        outcome
    }
}

#[async_trait]
impl PostService for MockRemote {
    async fn create_post(
        &self,
        content: &str,
        topic_id: &str,
        reply_to: Option<&str>,
        quoted_post: Option<&str>,
    ) -> Result<(), RemoteError> {
        let call = RemoteCall::CreatePost {
            content: content.to_string(),
            topic_id: topic_id.to_string(),
            reply_to: reply_to.map(str::to_string),
            quoted_post: quoted_post.map(str::to_string),
        };
        self.record(call, Some(topic_id)).await
    }

    async fn like_post(&self, post_id: &str) -> Result<(), RemoteError> {
        let call = RemoteCall::LikePost {
            post_id: post_id.to_string(),
        };
        self.record(call, None).await
    }
}

#[async_trait]
impl TopicTransport for MockRemote {
    async fn join_topic(&self, topic_id: &str) -> Result<(), RemoteError> {
        let call = RemoteCall::JoinTopic {
            topic_id: topic_id.to_string(),
        };
        self.record(call, Some(topic_id)).await
    }

    async fn leave_topic(&self, topic_id: &str) -> Result<(), RemoteError> {
        let call = RemoteCall::LeaveTopic {
            topic_id: topic_id.to_string(),
        };
        self.record(call, Some(topic_id)).await
    }
}

#[async_trait]
impl TopicSubscriptions for MockRemote {
    async fn subscribe_to_topic(&self, topic_id: &str) -> Result<(), RemoteError> {
        let call = RemoteCall::SubscribeToTopic {
            topic_id: topic_id.to_string(),
        };
        self.record(call, Some(topic_id)).await
    }
}
