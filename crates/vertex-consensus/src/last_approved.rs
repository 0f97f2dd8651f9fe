//! The "last approved block" slot.
//!
//! A single-assignment cell: the ceremony writes it exactly once, and a
//! second write is rejected. Readers polling before approval observe
//! [`ConsensusError::GenesisUnavailable`].

use crate::error::ConsensusError;
use once_cell::sync::OnceCell;
use vertex_types::ApprovedBlock;

#[derive(Default)]
pub struct LastApprovedBlock {
    cell: OnceCell<ApprovedBlock>,
}

impl LastApprovedBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the approved block. Fails if one was already published.
    pub fn set(&self, approved: ApprovedBlock) -> Result<(), ConsensusError> {
        self.cell
            .set(approved)
            .map_err(|_| ConsensusError::AlreadyApproved)
    }

    /// The approved block, or `GenesisUnavailable` while the ceremony is
    /// still running.
    pub fn get(&self) -> Result<&ApprovedBlock, ConsensusError> {
        self.cell.get().ok_or(ConsensusError::GenesisUnavailable)
    }

    pub fn try_get(&self) -> Option<&ApprovedBlock> {
        self.cell.get()
    }
}
