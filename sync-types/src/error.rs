//! Error types for the sync data model.

use thiserror::Error;

/// A timestamp could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid timestamp: {0}")]
pub struct TimestampError(pub String);

/// An action payload does not carry what its action kind needs.
#[derive(Debug, Error)]
pub enum ActionDataError {
    /// A field required by the action kind is absent or empty.
    #[error("missing required field `{field}` for {action_type}")]
    MissingField {
        /// The action kind being interpreted.
        action_type: String,
        /// The camelCase name of the missing field.
        field: &'static str,
    },

    /// The payload is not a valid action data object.
    #[error("malformed action data: {0}")]
    Malformed(#[source] serde_json::Error),
}
