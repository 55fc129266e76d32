//! Partitioning of queued actions into per-topic groups.
//!
//! Topics are independent, so groups may be processed concurrently; the
//! actions inside one group keep their queue order.

use std::collections::HashMap;
use sync_types::OfflineAction;

/// Group key for actions that carry no topic id.
pub const DEFAULT_GROUP: &str = "default";

/// Queued actions sharing one topic, in queue order.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicGroup {
    /// Topic id, or the default group key.
    pub topic: String,
    /// Actions in their original relative order.
    pub actions: Vec<OfflineAction>,
}

/// Partition actions by `actionData.topicId`.
///
/// Groups are returned in order of first appearance. Actions without a
/// topic id land in `default_group`.
pub fn group_by_topic(actions: Vec<OfflineAction>, default_group: &str) -> Vec<TopicGroup> {
    let mut groups: Vec<TopicGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for action in actions {
        let topic = action.topic_id().unwrap_or(default_group).to_string();
        match index.get(&topic) {
            Some(&position) => groups[position].actions.push(action),
            None => {
                index.insert(topic.clone(), groups.len());
                groups.push(TopicGroup {
                    topic,
                    actions: vec![action],
                });
            }
        }
    }

    groups
}
