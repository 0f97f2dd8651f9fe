//! Vertex Types - Core type definitions for the VERTEX block DAG.
//!
//! This crate provides the fundamental types shared by the consensus core:
//! - Block hashes (opaque 32-byte identifiers)
//! - Validator identities (32-byte ed25519 public keys)
//! - Blocks, block metadata, justifications, bonds
//! - Genesis approval messages (candidates, approvals, approved blocks)
//! - Wire encodings with fixed protobuf field tags

pub mod approval;
pub mod block;
pub mod error;
pub mod hash;
pub mod validator;
pub mod wire;

pub use approval::{
    ApprovedBlock, ApprovedBlockCandidate, BlockApproval, Signature, UnapprovedBlock,
};
pub use block::{Block, BlockMetadata, Bond, Justification};
pub use error::TypesError;
pub use hash::BlockHash;
pub use validator::ValidatorId;

/// Position of a block in the topological ordering: 0 for parentless blocks,
/// otherwise 1 + the maximum parent rank.
pub type Rank = u64;
