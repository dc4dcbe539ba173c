use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid {kind} id {name:?}: {reason}")]
    InvalidName {
        kind: &'static str,
        name: String,
        reason: String,
    },

    #[error("unknown value type tag: {0}")]
    UnknownValueType(String),

    #[error("invalid {value_type} value {text:?}: {reason}")]
    InvalidValue {
        value_type: &'static str,
        text: String,
        reason: String,
    },

    #[error("unknown owner type: {0}")]
    UnknownOwnerType(String),

    #[error("unknown permission: {0}")]
    UnknownPermission(String),
}
