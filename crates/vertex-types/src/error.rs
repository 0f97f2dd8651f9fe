use thiserror::Error;

/// Errors that can occur when constructing or decoding core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("Invalid hash length: expected 32, got {0}")]
    InvalidHashLength(usize),

    #[error("Invalid validator length: expected 0 or 32 bytes, got {0}")]
    MalformedValidator(usize),

    #[error("Invalid public key length: expected 32, got {0}")]
    InvalidPublicKeyLength(usize),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid hex: {0}")]
    InvalidHex(String),
}

impl From<hex::FromHexError> for TypesError {
    fn from(e: hex::FromHexError) -> Self {
        TypesError::InvalidHex(e.to_string())
    }
}
