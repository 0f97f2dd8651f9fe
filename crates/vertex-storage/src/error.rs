use thiserror::Error;

/// Errors that can occur in DAG storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Malformed validator: expected 0 or 32 bytes, got {actual}")]
    MalformedValidator { actual: usize },

    #[error("Store is closed")]
    StoreClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Corrupt checkpoint: {0}")]
    CorruptCheckpoint(String),
}

impl From<vertex_types::TypesError> for StorageError {
    fn from(e: vertex_types::TypesError) -> Self {
        match e {
            vertex_types::TypesError::MalformedValidator(actual) => {
                StorageError::MalformedValidator { actual }
            }
            other => StorageError::Codec(other.to_string()),
        }
    }
}
