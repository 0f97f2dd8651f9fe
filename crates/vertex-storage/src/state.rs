//! In-memory DAG state shared by the persistent and in-memory stores.
//!
//! Holds the five stores of the representation and applies inserts. The
//! parent/child and justification relations are kept as two independent
//! maps keyed by hash; metadata values never hold back-pointers.

use crate::representation::DagRepresentation;
use im::{HashMap, HashSet, Vector};
use vertex_types::{Block, BlockHash, BlockMetadata, Rank, ValidatorId};

#[derive(Clone, Default)]
pub(crate) struct DagState {
    metadata: HashMap<BlockHash, BlockMetadata>,
    children: HashMap<BlockHash, HashSet<BlockHash>>,
    justified_by: HashMap<BlockHash, HashSet<BlockHash>>,
    latest: HashMap<ValidatorId, BlockHash>,
    topo_sort: Vector<Vector<BlockHash>>,
}

impl DagState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.metadata.contains_key(hash)
    }

    pub fn latest_map(&self) -> &HashMap<ValidatorId, BlockHash> {
        &self.latest
    }

    /// Rank for a new block: 0 with no parents, else one past the highest
    /// known parent. Parents missing from the store contribute nothing.
    fn rank_for(&self, parents: &[BlockHash]) -> Rank {
        parents
            .iter()
            .filter_map(|p| self.metadata.get(p))
            .map(|m| m.rank)
            .max()
            .map(|r| r + 1)
            .unwrap_or(0)
    }

    /// Apply a validated block, returning its metadata and the
    /// latest-message updates it caused, in deterministic order.
    ///
    /// The caller must have parsed the validator field already; the block's
    /// author is passed in so this step cannot fail.
    pub fn apply_block(
        &mut self,
        block: &Block,
        author: Option<ValidatorId>,
    ) -> (BlockMetadata, Vec<(ValidatorId, BlockHash)>) {
        let rank = self.rank_for(&block.parents);
        let meta = BlockMetadata {
            hash: block.hash,
            parents: block.parents.clone(),
            justifications: block.justifications.clone(),
            validator: author,
            rank,
            bonded_validators: block.bonds.iter().map(|b| b.validator).collect(),
        };

        let justified = meta.justified_validators();
        let mut updates = Vec::new();
        if let Some(author) = author {
            updates.push((author, block.hash));
        }
        // A validator bonded by this block with no justification in it
        // inherits this block as its latest message, unless it already has
        // one. Iterate bonds (not the set) so the log order is stable.
        for bond in &block.bonds {
            let v = bond.validator;
            if Some(v) == author
                || justified.contains(&v)
                || self.latest.contains_key(&v)
                || updates.iter().any(|(u, _)| *u == v)
            {
                continue;
            }
            updates.push((v, block.hash));
        }

        self.link(&meta);
        for (validator, hash) in &updates {
            self.latest.insert(*validator, *hash);
        }
        (meta, updates)
    }

    /// Replay one metadata record (startup path). The stored rank is
    /// trusted; latest messages are restored separately from their own log.
    pub fn apply_metadata(&mut self, meta: BlockMetadata) {
        if self.contains(&meta.hash) {
            return;
        }
        self.link(&meta);
    }

    /// Restore one latest-message entry (startup path).
    pub fn set_latest_entry(&mut self, validator: ValidatorId, hash: BlockHash) {
        self.latest.insert(validator, hash);
    }

    fn link(&mut self, meta: &BlockMetadata) {
        for parent in &meta.parents {
            let mut set = self.children.get(parent).cloned().unwrap_or_default();
            set.insert(meta.hash);
            self.children.insert(*parent, set);
        }
        for justification in &meta.justifications {
            let mut set = self
                .justified_by
                .get(&justification.latest_hash)
                .cloned()
                .unwrap_or_default();
            set.insert(meta.hash);
            self.justified_by.insert(justification.latest_hash, set);
        }

        let rank = meta.rank as usize;
        while self.topo_sort.len() <= rank {
            self.topo_sort.push_back(Vector::new());
        }
        if let Some(level) = self.topo_sort.get_mut(rank) {
            level.push_back(meta.hash);
        }

        self.metadata.insert(meta.hash, meta.clone());
    }

    pub fn snapshot(&self) -> DagRepresentation {
        DagRepresentation {
            metadata: self.metadata.clone(),
            children: self.children.clone(),
            justified_by: self.justified_by.clone(),
            latest: self.latest.clone(),
            topo_sort: self.topo_sort.clone(),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
