//! Locally queued user actions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::{ActionDataError, LocalId, Timestamp};

/// A recorded, not-yet-confirmed user intent.
///
/// Created by the application when the user acts while offline (or
/// speculatively), and removed from the queue by the caller once a sync
/// reports it as synced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineAction {
    /// Storage row id. Absent before the action is first persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Stable client-generated id, unique within the user's queue.
    pub local_id: LocalId,
    /// Public key of the acting user.
    pub user_pubkey: String,
    /// What kind of action this is.
    pub action_type: ActionType,
    /// Kind-specific payload.
    #[serde(default)]
    pub action_data: ActionData,
    /// When the action was queued locally. Basis for conflict comparison.
    pub created_at: Timestamp,
    /// Whether the action has been confirmed against the remote system.
    #[serde(default)]
    pub is_synced: bool,
}

impl OfflineAction {
    /// Queue a new action now, with a freshly generated local id.
    pub fn new(user_pubkey: &str, action_type: ActionType, action_data: ActionData) -> Self {
        Self {
            id: None,
            local_id: LocalId::new(),
            user_pubkey: user_pubkey.to_string(),
            action_type,
            action_data,
            created_at: Timestamp::now(),
            is_synced: false,
        }
    }

    /// Override the local id.
    pub fn with_local_id(mut self, local_id: impl Into<LocalId>) -> Self {
        self.local_id = local_id.into();
        self
    }

    /// Override the queue time.
    pub fn with_created_at(mut self, created_at: Timestamp) -> Self {
        self.created_at = created_at;
        self
    }

    /// The topic this action belongs to, if any. Empty ids count as absent.
    pub fn topic_id(&self) -> Option<&str> {
        self.action_data.topic_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// The closed set of action kinds a user can queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Publish a post (optionally a reply or quote).
    CreatePost,
    /// Delete one of the user's posts.
    DeletePost,
    /// Like a post.
    LikePost,
    /// Generic reaction.
    Like,
    /// Boost (repost) a post.
    Boost,
    /// Bookmark a post.
    Bookmark,
    /// Remove a bookmark.
    Unbookmark,
    /// Follow a user.
    Follow,
    /// Unfollow a user.
    Unfollow,
    /// Update the user's own profile.
    ProfileUpdate,
    /// Join a topic.
    #[serde(alias = "topic_join")]
    JoinTopic,
    /// Leave a topic.
    #[serde(alias = "topic_leave")]
    LeaveTopic,
    /// Create a topic.
    TopicCreate,
    /// Update topic metadata.
    TopicUpdate,
    /// Delete a topic.
    TopicDelete,
    /// Send a direct message.
    SendDirectMessage,
}

impl ActionType {
    /// The wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreatePost => "create_post",
            Self::DeletePost => "delete_post",
            Self::LikePost => "like_post",
            Self::Like => "like",
            Self::Boost => "boost",
            Self::Bookmark => "bookmark",
            Self::Unbookmark => "unbookmark",
            Self::Follow => "follow",
            Self::Unfollow => "unfollow",
            Self::ProfileUpdate => "profile_update",
            Self::JoinTopic => "join_topic",
            Self::LeaveTopic => "leave_topic",
            Self::TopicCreate => "topic_create",
            Self::TopicUpdate => "topic_update",
            Self::TopicDelete => "topic_delete",
            Self::SendDirectMessage => "send_direct_message",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of an [`OfflineAction`].
///
/// The fields the engine interprets are typed; anything else the
/// application stored is preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionData {
    /// Topic the action belongs to. Drives per-topic grouping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
    /// Target post.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    /// Target user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Post body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Post being replied to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    /// Post being quoted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted_post: Option<String>,
    /// Kind of entity to check for remote modification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    /// Id of the entity to check for remote modification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    /// Version number for version-based conflict resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    /// Application-specific fields not interpreted by the engine.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ActionData {
    /// Payload for a post in a topic.
    pub fn post(content: &str, topic_id: &str) -> Self {
        Self {
            content: Some(content.to_string()),
            topic_id: Some(topic_id.to_string()),
            ..Self::default()
        }
    }

    /// Payload referencing a post.
    pub fn for_post(post_id: &str) -> Self {
        Self {
            post_id: Some(post_id.to_string()),
            ..Self::default()
        }
    }

    /// Payload referencing a topic.
    pub fn for_topic(topic_id: &str) -> Self {
        Self {
            topic_id: Some(topic_id.to_string()),
            ..Self::default()
        }
    }

    /// Attach the entity used for conflict lookups.
    pub fn with_entity(mut self, entity_type: &str, entity_id: &str) -> Self {
        self.entity_type = Some(entity_type.to_string());
        self.entity_id = Some(entity_id.to_string());
        self
    }

    /// Attach a version number.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    /// Fetch a required string field, treating empty strings as absent.
    pub fn require<'a>(
        value: &'a Option<String>,
        action_type: ActionType,
        field: &'static str,
    ) -> Result<&'a str, ActionDataError> {
        value
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ActionDataError::MissingField {
                action_type: action_type.to_string(),
                field,
            })
    }

    /// Convert to a plain JSON snapshot.
    pub fn to_value(&self) -> Value {
        // A struct of strings, integers and a JSON map always serializes.
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }

    /// Rebuild from a plain JSON snapshot.
    pub fn from_value(value: Value) -> Result<Self, ActionDataError> {
        serde_json::from_value(value).map_err(ActionDataError::Malformed)
    }
}

/// Entity kinds whose last-modified time can be looked up remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// A post.
    Post,
    /// A topic.
    Topic,
    /// A user profile.
    User,
    /// A reaction to a post.
    Reaction,
}

impl EntityType {
    /// The wire name of this entity kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Topic => "topic",
            Self::User => "user",
            Self::Reaction => "reaction",
        }
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(Self::Post),
            "topic" => Ok(Self::Topic),
            "user" => Ok(Self::User),
            "reaction" => Ok(Self::Reaction),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
