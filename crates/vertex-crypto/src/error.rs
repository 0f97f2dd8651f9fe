use thiserror::Error;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Invalid signature length: expected 64, got {0}")]
    InvalidSignatureLength(usize),

    #[error("Signature verification failed")]
    VerificationFailed,
}
