//! Mapping offline actions onto remote operations.
//!
//! [`RemoteOperation::for_action`] is an exhaustive match over
//! [`ActionType`]; kinds without a remote mapping fail with
//! [`ApplyError::UnsupportedActionKind`].

use crate::remote::{Remote, RemoteError};
use std::time::Duration;
use sync_types::{ActionData, ActionDataError, ActionType, OfflineAction};
use thiserror::Error;
use tracing::debug;

/// Errors from applying a single action.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The action kind has no remote mapping.
    #[error("unsupported action kind: {0}")]
    UnsupportedActionKind(ActionType),

    /// The payload lacks what the action kind needs.
    #[error("invalid action payload: {0}")]
    InvalidPayload(#[from] ActionDataError),

    /// A remote collaborator failed.
    #[error("remote operation failed: {0}")]
    Remote(#[from] RemoteError),

    /// Application did not finish in time.
    #[error("apply timed out after {after:?}")]
    Timeout {
        /// The configured limit.
        after: Duration,
    },
}

/// The concrete remote operation an action stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOperation {
    /// Publish a post.
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
    /// Like a post.
    LikePost {
        /// Liked post.
        post_id: String,
    },
    /// Join a topic and subscribe to its traffic.
    JoinTopic {
        /// Joined topic.
        topic_id: String,
    },
    /// Leave a topic.
    LeaveTopic {
        /// Left topic.
        topic_id: String,
    },
}

impl RemoteOperation {
    /// Build the operation for an action.
    pub fn for_action(action: &OfflineAction) -> Result<Self, ApplyError> {
        let kind = action.action_type;
        let data = &action.action_data;

        match kind {
            ActionType::CreatePost => Ok(Self::CreatePost {
                content: ActionData::require(&data.content, kind, "content")?.to_string(),
                topic_id: ActionData::require(&data.topic_id, kind, "topicId")?.to_string(),
                reply_to: data.reply_to.clone(),
                quoted_post: data.quoted_post.clone(),
            }),
            ActionType::LikePost => Ok(Self::LikePost {
                post_id: ActionData::require(&data.post_id, kind, "postId")?.to_string(),
            }),
            ActionType::JoinTopic => Ok(Self::JoinTopic {
                topic_id: ActionData::require(&data.topic_id, kind, "topicId")?.to_string(),
            }),
            ActionType::LeaveTopic => Ok(Self::LeaveTopic {
                topic_id: ActionData::require(&data.topic_id, kind, "topicId")?.to_string(),
            }),
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
            | ActionType::SendDirectMessage => Err(ApplyError::UnsupportedActionKind(kind)),
        }
    }
}

/// Applies actions against the remote collaborators.
#[derive(Debug, Clone)]
pub struct ActionApplier {
    remote: Remote,
    timeout: Option<Duration>,
}

impl ActionApplier {
    /// Create an applier for the given remote.
    pub fn new(remote: Remote) -> Self {
        Self {
            remote,
            timeout: None,
        }
    }

    /// Bound each action's application.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Apply one action.
    ///
    /// # Errors
    ///
    /// Unsupported kinds, invalid payloads, remote failures and timeouts are
    /// all returned to the caller; nothing is retried here.
    pub async fn apply_action(&self, action: &OfflineAction) -> Result<(), ApplyError> {
        let operation = RemoteOperation::for_action(action)?;
        debug!(local_id = %action.local_id, operation = ?operation, "applying action");

        match self.timeout {
            Some(after) => tokio::time::timeout(after, self.execute(&operation))
                .await
                .map_err(|_| ApplyError::Timeout { after })?,
            None => self.execute(&operation).await,
        }
    }

    async fn execute(&self, operation: &RemoteOperation) -> Result<(), ApplyError> {
        match operation {
            RemoteOperation::CreatePost {
                content,
                topic_id,
                reply_to,
                quoted_post,
            } => {
                self.remote
                    .posts
                    .create_post(
                        content,
                        topic_id,
                        reply_to.as_deref(),
                        quoted_post.as_deref(),
                    )
                    .await?
            }
            RemoteOperation::LikePost { post_id } => self.remote.posts.like_post(post_id).await?,
            RemoteOperation::JoinTopic { topic_id } => {
                // No rollback of the join if the subscription fails; joining
                // again on the next pass is harmless.
                self.remote.transport.join_topic(topic_id).await?;
                self.remote
                    .subscriptions
                    .subscribe_to_topic(topic_id)
                    .await?
            }
            RemoteOperation::LeaveTopic { topic_id } => {
                self.remote.transport.leave_topic(topic_id).await?
            }
        }
        Ok(())
    }
}
