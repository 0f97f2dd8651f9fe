use crate::block::Block;
use crate::validator::ValidatorId;
use std::fmt;

/// A detached signature over the candidate digest.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub public_key: ValidatorId,
    pub algorithm: String,
    pub sig: Vec<u8>,
}

impl Signature {
    pub fn new(public_key: ValidatorId, algorithm: impl Into<String>, sig: Vec<u8>) -> Self {
        Self {
            public_key,
            algorithm: algorithm.into(),
            sig,
        }
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Signature({}, {:?}, 0x{}...)",
            self.algorithm,
            self.public_key,
            hex::encode(&self.sig[..self.sig.len().min(4)])
        )
    }
}

/// The block proposed for genesis, together with the number of approvals
/// it needs before the network starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApprovedBlockCandidate {
    pub block: Block,
    pub required_sigs: u32,
}

impl ApprovedBlockCandidate {
    pub fn new(block: Block, required_sigs: u32) -> Self {
        Self {
            block,
            required_sigs,
        }
    }
}

/// Periodic ceremony broadcast: the candidate plus the ceremony window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnapprovedBlock {
    pub candidate: ApprovedBlockCandidate,
    pub timestamp: i64,
    pub duration_millis: i64,
}

/// A single validator's approval of the candidate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockApproval {
    pub candidate: ApprovedBlockCandidate,
    pub signature: Signature,
}

/// The ceremony's output: the candidate plus every collected signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApprovedBlock {
    pub candidate: ApprovedBlockCandidate,
    pub signatures: Vec<Signature>,
}
