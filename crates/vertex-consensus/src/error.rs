use thiserror::Error;

/// Errors that can occur in the genesis approval protocol.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    #[error("Approval from untrusted validator")]
    UntrustedApprover,

    #[error("Invalid approval signature: {0}")]
    InvalidApprovalSignature(String),

    #[error("Approval names a different candidate")]
    WrongCandidate,

    #[error("Approved block already set")]
    AlreadyApproved,

    #[error("Genesis is not approved yet")]
    GenesisUnavailable,

    #[error("Crypto error: {0}")]
    Crypto(#[from] vertex_crypto::CryptoError),

    #[error("Type error: {0}")]
    Types(#[from] vertex_types::TypesError),
}
