use crate::error::TypesError;
use crate::hash::BlockHash;
use crate::validator::ValidatorId;
use crate::Rank;
use std::collections::HashSet;

/// A reference to the latest message an author had observed from a validator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Justification {
    pub validator: ValidatorId,
    pub latest_hash: BlockHash,
}

impl Justification {
    pub fn new(validator: ValidatorId, latest_hash: BlockHash) -> Self {
        Self {
            validator,
            latest_hash,
        }
    }
}

/// A bonded-validator entry: validator identity plus staked amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Bond {
    pub validator: ValidatorId,
    pub stake: u64,
}

impl Bond {
    pub fn new(validator: ValidatorId, stake: u64) -> Self {
        Self { validator, stake }
    }
}

/// A block as submitted to the DAG store.
///
/// The validator field is raw bytes: the store validates it on insert
/// (empty for genesis, exactly 32 bytes otherwise).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub hash: BlockHash,
    pub parents: Vec<BlockHash>,
    pub justifications: Vec<Justification>,
    pub validator: Vec<u8>,
    pub bonds: Vec<Bond>,
    pub timestamp: i64,
}

impl Block {
    /// Create a block with no justifications or bonds.
    pub fn new(hash: BlockHash, parents: Vec<BlockHash>, validator: Vec<u8>) -> Self {
        Self {
            hash,
            parents,
            justifications: Vec::new(),
            validator,
            bonds: Vec::new(),
            timestamp: 0,
        }
    }

    pub fn with_justifications(mut self, justifications: Vec<Justification>) -> Self {
        self.justifications = justifications;
        self
    }

    pub fn with_bonds(mut self, bonds: Vec<Bond>) -> Self {
        self.bonds = bonds;
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Parse the validator field, rejecting malformed lengths.
    pub fn validator_id(&self) -> Result<Option<ValidatorId>, TypesError> {
        ValidatorId::from_block_field(&self.validator)
    }
}

/// Immutable per-block record kept by the DAG store.
///
/// Created on insert with the computed rank; never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockMetadata {
    pub hash: BlockHash,
    pub parents: Vec<BlockHash>,
    pub justifications: Vec<Justification>,
    pub validator: Option<ValidatorId>,
    pub rank: Rank,
    pub bonded_validators: HashSet<ValidatorId>,
}

impl BlockMetadata {
    /// Build metadata from a block and its computed rank.
    ///
    /// Fails when the block's validator field is neither empty nor 32 bytes.
    pub fn from_block(block: &Block, rank: Rank) -> Result<Self, TypesError> {
        let validator = block.validator_id()?;
        let bonded_validators = block.bonds.iter().map(|b| b.validator).collect();
        Ok(Self {
            hash: block.hash,
            parents: block.parents.clone(),
            justifications: block.justifications.clone(),
            validator,
            rank,
            bonded_validators,
        })
    }

    /// Validators justified by this block.
    pub fn justified_validators(&self) -> HashSet<ValidatorId> {
        self.justifications.iter().map(|j| j.validator).collect()
    }
}
