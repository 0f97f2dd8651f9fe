//! Read-only DAG snapshot.
//!
//! Snapshots use persistent collections, so capturing one is an O(1) clone
//! and it stays valid (and unchanged) across later inserts.

use im::{HashMap, HashSet, Vector};
use vertex_types::{BlockHash, BlockMetadata, Rank, ValidatorId};

/// A consistent view of the DAG at a single point in time.
#[derive(Clone, Debug, PartialEq)]
pub struct DagRepresentation {
    pub(crate) metadata: HashMap<BlockHash, BlockMetadata>,
    pub(crate) children: HashMap<BlockHash, HashSet<BlockHash>>,
    pub(crate) justified_by: HashMap<BlockHash, HashSet<BlockHash>>,
    pub(crate) latest: HashMap<ValidatorId, BlockHash>,
    pub(crate) topo_sort: Vector<Vector<BlockHash>>,
}

impl DagRepresentation {
    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.metadata.contains_key(hash)
    }

    pub fn lookup(&self, hash: &BlockHash) -> Option<&BlockMetadata> {
        self.metadata.get(hash)
    }

    /// Blocks naming `hash` as a parent.
    pub fn children(&self, hash: &BlockHash) -> Option<&HashSet<BlockHash>> {
        self.children.get(hash)
    }

    /// Blocks citing `hash` in a justification.
    pub fn justification_to_blocks(&self, hash: &BlockHash) -> Option<&HashSet<BlockHash>> {
        self.justified_by.get(hash)
    }

    pub fn latest_message_hash(&self, validator: &ValidatorId) -> Option<&BlockHash> {
        self.latest.get(validator)
    }

    pub fn latest_message(&self, validator: &ValidatorId) -> Option<&BlockMetadata> {
        self.latest_message_hash(validator).and_then(|h| self.lookup(h))
    }

    pub fn latest_message_hashes(&self) -> &HashMap<ValidatorId, BlockHash> {
        &self.latest
    }

    pub fn latest_messages(&self) -> HashMap<ValidatorId, BlockMetadata> {
        self.latest
            .iter()
            .filter_map(|(v, h)| self.lookup(h).map(|m| (*v, m.clone())))
            .collect()
    }

    pub fn metadata_iter(&self) -> impl Iterator<Item = (&BlockHash, &BlockMetadata)> {
        self.metadata.iter()
    }

    pub fn children_iter(&self) -> impl Iterator<Item = (&BlockHash, &HashSet<BlockHash>)> {
        self.children.iter()
    }

    pub fn justified_by_iter(&self) -> impl Iterator<Item = (&BlockHash, &HashSet<BlockHash>)> {
        self.justified_by.iter()
    }

    pub fn block_count(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Ranks `start..`, one vector of hashes per rank.
    pub fn topo_sort(&self, start: Rank) -> Vector<Vector<BlockHash>> {
        self.topo_sort.clone().skip(self.clamp(start))
    }

    /// Ranks `start..=end`.
    pub fn topo_sort_range(&self, start: Rank, end: Rank) -> Vector<Vector<BlockHash>> {
        if end < start {
            return Vector::new();
        }
        let take = (end - start + 1).min(usize::MAX as u64) as usize;
        self.topo_sort.clone().skip(self.clamp(start)).take(take)
    }

    /// The last `count` ranks.
    pub fn topo_sort_tail(&self, count: u64) -> Vector<Vector<BlockHash>> {
        let skip = (self.topo_sort.len() as u64).saturating_sub(count);
        self.topo_sort.clone().skip(skip as usize)
    }

    /// Total order over blocks of rank >= `start`: ascending rank, then
    /// insertion order within the rank. Blocks below `start` are undefined
    /// under this order and are absent from the result.
    pub fn derive_ordering(&self, start: Rank) -> Vec<BlockHash> {
        self.topo_sort(start)
            .iter()
            .flat_map(|rank| rank.iter().copied())
            .collect()
    }

    fn clamp(&self, rank: Rank) -> usize {
        rank.min(self.topo_sort.len() as u64) as usize
    }
}
