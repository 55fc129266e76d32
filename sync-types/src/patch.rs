//! Shallow key-level patches between two JSON snapshots.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One atomic change between two snapshots.
///
/// `path` is a dot-separated key path. Diffing only ever produces
/// single-segment paths; nested objects are one opaque value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DiffPatch {
    /// Key present only in the new snapshot.
    Add {
        /// Key path.
        path: String,
        /// New value.
        value: Value,
    },
    /// Key present in both snapshots with different values.
    Modify {
        /// Key path.
        path: String,
        /// New value.
        value: Value,
        /// Previous value.
        #[serde(
            rename = "oldValue",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        old_value: Option<Value>,
    },
    /// Key present only in the old snapshot.
    Delete {
        /// Key path.
        path: String,
        /// Previous value.
        #[serde(
            rename = "oldValue",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        old_value: Option<Value>,
    },
}

impl DiffPatch {
    /// The key path this patch touches.
    pub fn path(&self) -> &str {
        match self {
            Self::Add { path, .. } | Self::Modify { path, .. } | Self::Delete { path, .. } => {
                path
            }
        }
    }

    /// The value written by this patch, if it writes one.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Add { value, .. } | Self::Modify { value, .. } => Some(value),
            Self::Delete { .. } => None,
        }
    }
}
