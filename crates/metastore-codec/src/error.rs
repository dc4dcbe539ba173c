use metastore_types::TypeError;
use thiserror::Error;

/// Errors produced while encoding or decoding metastore files.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// A node decoded but its content is not valid for the model.
    #[error("invalid content: {0}")]
    InvalidContent(#[from] TypeError),
}

pub type CodecResult<T> = Result<T, CodecError>;
