//! Wire encodings with fixed protobuf field tags.
//!
//! Field tags are part of the external contract: the on-disk metadata
//! record and every ceremony message must decode across versions, so tags
//! are never renumbered. Messages are declared by hand rather than
//! generated; conversions to domain types validate lengths and presence.

use crate::approval::{
    ApprovedBlock, ApprovedBlockCandidate, BlockApproval, Signature, UnapprovedBlock,
};
use crate::block::{Block, BlockMetadata, Bond, Justification};
use crate::error::TypesError;
use crate::hash::BlockHash;
use crate::validator::ValidatorId;
use prost::Message;

#[derive(Clone, PartialEq, Message)]
pub struct JustificationMsg {
    #[prost(bytes = "vec", tag = "1")]
    pub validator: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub latest_block_hash: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct BondMsg {
    #[prost(bytes = "vec", tag = "1")]
    pub validator: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub stake: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct BlockMsg {
    #[prost(bytes = "vec", tag = "1")]
    pub hash: Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub parents: Vec<Vec<u8>>,
    #[prost(message, repeated, tag = "3")]
    pub justifications: Vec<JustificationMsg>,
    #[prost(bytes = "vec", tag = "4")]
    pub validator: Vec<u8>,
    #[prost(message, repeated, tag = "5")]
    pub bonds: Vec<BondMsg>,
    #[prost(int64, tag = "6")]
    pub timestamp: i64,
}

/// On-disk record of the block metadata log.
#[derive(Clone, PartialEq, Message)]
pub struct BlockMetadataRecord {
    #[prost(bytes = "vec", tag = "1")]
    pub hash: Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub parents: Vec<Vec<u8>>,
    #[prost(message, repeated, tag = "3")]
    pub justifications: Vec<JustificationMsg>,
    #[prost(bytes = "vec", tag = "4")]
    pub validator: Vec<u8>,
    #[prost(uint64, tag = "5")]
    pub rank: u64,
    #[prost(bytes = "vec", repeated, tag = "6")]
    pub bonded_validators: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct SignatureMsg {
    #[prost(bytes = "vec", tag = "1")]
    pub public_key: Vec<u8>,
    #[prost(string, tag = "2")]
    pub algorithm: String,
    #[prost(bytes = "vec", tag = "3")]
    pub sig: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ApprovedBlockCandidateMsg {
    #[prost(message, optional, tag = "1")]
    pub block: Option<BlockMsg>,
    #[prost(uint32, tag = "2")]
    pub required_sigs: u32,
}

#[derive(Clone, PartialEq, Message)]
pub struct UnapprovedBlockMsg {
    #[prost(message, optional, tag = "1")]
    pub candidate: Option<ApprovedBlockCandidateMsg>,
    #[prost(int64, tag = "2")]
    pub timestamp: i64,
    #[prost(int64, tag = "3")]
    pub duration_ms: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct BlockApprovalMsg {
    #[prost(message, optional, tag = "1")]
    pub candidate: Option<ApprovedBlockCandidateMsg>,
    #[prost(message, optional, tag = "2")]
    pub signature: Option<SignatureMsg>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ApprovedBlockMsg {
    #[prost(message, optional, tag = "1")]
    pub candidate: Option<ApprovedBlockCandidateMsg>,
    #[prost(message, repeated, tag = "2")]
    pub signatures: Vec<SignatureMsg>,
}

// Domain -> wire

impl From<&Justification> for JustificationMsg {
    fn from(j: &Justification) -> Self {
        Self {
            validator: j.validator.as_bytes().to_vec(),
            latest_block_hash: j.latest_hash.as_bytes().to_vec(),
        }
    }
}

impl From<&Bond> for BondMsg {
    fn from(b: &Bond) -> Self {
        Self {
            validator: b.validator.as_bytes().to_vec(),
            stake: b.stake,
        }
    }
}

impl From<&Block> for BlockMsg {
    fn from(block: &Block) -> Self {
        Self {
            hash: block.hash.as_bytes().to_vec(),
            parents: block.parents.iter().map(|p| p.as_bytes().to_vec()).collect(),
            justifications: block.justifications.iter().map(Into::into).collect(),
            validator: block.validator.clone(),
            bonds: block.bonds.iter().map(Into::into).collect(),
            timestamp: block.timestamp,
        }
    }
}

impl From<&BlockMetadata> for BlockMetadataRecord {
    fn from(meta: &BlockMetadata) -> Self {
        // HashSet iteration order is unstable; sort so the record bytes are
        // deterministic for a given metadata value.
        let mut bonded: Vec<&ValidatorId> = meta.bonded_validators.iter().collect();
        bonded.sort();
        Self {
            hash: meta.hash.as_bytes().to_vec(),
            parents: meta.parents.iter().map(|p| p.as_bytes().to_vec()).collect(),
            justifications: meta.justifications.iter().map(Into::into).collect(),
            validator: meta
                .validator
                .map(|v| v.as_bytes().to_vec())
                .unwrap_or_default(),
            rank: meta.rank,
            bonded_validators: bonded.iter().map(|v| v.as_bytes().to_vec()).collect(),
        }
    }
}

impl From<&Signature> for SignatureMsg {
    fn from(s: &Signature) -> Self {
        Self {
            public_key: s.public_key.as_bytes().to_vec(),
            algorithm: s.algorithm.clone(),
            sig: s.sig.clone(),
        }
    }
}

impl From<&ApprovedBlockCandidate> for ApprovedBlockCandidateMsg {
    fn from(c: &ApprovedBlockCandidate) -> Self {
        Self {
            block: Some((&c.block).into()),
            required_sigs: c.required_sigs,
        }
    }
}

impl From<&UnapprovedBlock> for UnapprovedBlockMsg {
    fn from(u: &UnapprovedBlock) -> Self {
        Self {
            candidate: Some((&u.candidate).into()),
            timestamp: u.timestamp,
            duration_ms: u.duration_millis,
        }
    }
}

impl From<&BlockApproval> for BlockApprovalMsg {
    fn from(a: &BlockApproval) -> Self {
        Self {
            candidate: Some((&a.candidate).into()),
            signature: Some((&a.signature).into()),
        }
    }
}

impl From<&ApprovedBlock> for ApprovedBlockMsg {
    fn from(a: &ApprovedBlock) -> Self {
        Self {
            candidate: Some((&a.candidate).into()),
            signatures: a.signatures.iter().map(Into::into).collect(),
        }
    }
}

// Wire -> domain

impl TryFrom<JustificationMsg> for Justification {
    type Error = TypesError;

    fn try_from(msg: JustificationMsg) -> Result<Self, Self::Error> {
        Ok(Justification {
            validator: ValidatorId::from_slice(&msg.validator)?,
            latest_hash: BlockHash::from_slice(&msg.latest_block_hash)?,
        })
    }
}

impl TryFrom<BondMsg> for Bond {
    type Error = TypesError;

    fn try_from(msg: BondMsg) -> Result<Self, Self::Error> {
        Ok(Bond {
            validator: ValidatorId::from_slice(&msg.validator)?,
            stake: msg.stake,
        })
    }
}

impl TryFrom<BlockMsg> for Block {
    type Error = TypesError;

    fn try_from(msg: BlockMsg) -> Result<Self, Self::Error> {
        // Validator length is checked at insert time, not here; a decoded
        // block round-trips malformed fields unchanged.
        Ok(Block {
            hash: BlockHash::from_slice(&msg.hash)?,
            parents: msg
                .parents
                .iter()
                .map(|p| BlockHash::from_slice(p))
                .collect::<Result<_, _>>()?,
            justifications: msg
                .justifications
                .into_iter()
                .map(TryInto::try_into)
                .collect::<Result<_, _>>()?,
            validator: msg.validator,
            bonds: msg
                .bonds
                .into_iter()
                .map(TryInto::try_into)
                .collect::<Result<_, _>>()?,
            timestamp: msg.timestamp,
        })
    }
}

impl TryFrom<BlockMetadataRecord> for BlockMetadata {
    type Error = TypesError;

    fn try_from(msg: BlockMetadataRecord) -> Result<Self, Self::Error> {
        Ok(BlockMetadata {
            hash: BlockHash::from_slice(&msg.hash)?,
            parents: msg
                .parents
                .iter()
                .map(|p| BlockHash::from_slice(p))
                .collect::<Result<_, _>>()?,
            justifications: msg
                .justifications
                .into_iter()
                .map(TryInto::try_into)
                .collect::<Result<_, _>>()?,
            validator: ValidatorId::from_block_field(&msg.validator)?,
            rank: msg.rank,
            bonded_validators: msg
                .bonded_validators
                .iter()
                .map(|v| ValidatorId::from_slice(v))
                .collect::<Result<_, _>>()?,
        })
    }
}

impl TryFrom<SignatureMsg> for Signature {
    type Error = TypesError;

    fn try_from(msg: SignatureMsg) -> Result<Self, Self::Error> {
        Ok(Signature {
            public_key: ValidatorId::from_slice(&msg.public_key)?,
            algorithm: msg.algorithm,
            sig: msg.sig,
        })
    }
}

impl TryFrom<ApprovedBlockCandidateMsg> for ApprovedBlockCandidate {
    type Error = TypesError;

    fn try_from(msg: ApprovedBlockCandidateMsg) -> Result<Self, Self::Error> {
        let block = msg.block.ok_or(TypesError::MissingField("block"))?;
        Ok(ApprovedBlockCandidate {
            block: block.try_into()?,
            required_sigs: msg.required_sigs,
        })
    }
}

impl TryFrom<UnapprovedBlockMsg> for UnapprovedBlock {
    type Error = TypesError;

    fn try_from(msg: UnapprovedBlockMsg) -> Result<Self, Self::Error> {
        let candidate = msg.candidate.ok_or(TypesError::MissingField("candidate"))?;
        Ok(UnapprovedBlock {
            candidate: candidate.try_into()?,
            timestamp: msg.timestamp,
            duration_millis: msg.duration_ms,
        })
    }
}

impl TryFrom<BlockApprovalMsg> for BlockApproval {
    type Error = TypesError;

    fn try_from(msg: BlockApprovalMsg) -> Result<Self, Self::Error> {
        let candidate = msg.candidate.ok_or(TypesError::MissingField("candidate"))?;
        let signature = msg.signature.ok_or(TypesError::MissingField("signature"))?;
        Ok(BlockApproval {
            candidate: candidate.try_into()?,
            signature: signature.try_into()?,
        })
    }
}

impl TryFrom<ApprovedBlockMsg> for ApprovedBlock {
    type Error = TypesError;

    fn try_from(msg: ApprovedBlockMsg) -> Result<Self, Self::Error> {
        let candidate = msg.candidate.ok_or(TypesError::MissingField("candidate"))?;
        Ok(ApprovedBlock {
            candidate: candidate.try_into()?,
            signatures: msg
                .signatures
                .into_iter()
                .map(TryInto::try_into)
                .collect::<Result<_, _>>()?,
        })
    }
}

impl ApprovedBlockCandidate {
    /// Canonical serialisation signed during the approval ceremony.
    ///
    /// Protobuf encoding in ascending tag order; two structurally equal
    /// candidates always produce identical bytes.
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        ApprovedBlockCandidateMsg::from(self).encode_to_vec()
    }
}

impl BlockMetadata {
    /// Encode as an on-disk metadata record.
    pub fn to_record_bytes(&self) -> Vec<u8> {
        BlockMetadataRecord::from(self).encode_to_vec()
    }

    /// Decode from an on-disk metadata record.
    pub fn from_record_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        let record = BlockMetadataRecord::decode(bytes)
            .map_err(|e| TypesError::Decode(e.to_string()))?;
        record.try_into()
    }
}
