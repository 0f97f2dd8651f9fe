//! Content-addressed block payload storage.
//!
//! Outer layers put the full block here after a successful DAG insert; the
//! DAG store itself keeps only metadata.

use crate::error::StorageError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use vertex_types::{Block, BlockHash};

#[async_trait]
pub trait BlockStore: Send + Sync {
    async fn put(&self, block: Block) -> Result<(), StorageError>;
    async fn get(&self, hash: &BlockHash) -> Result<Option<Block>, StorageError>;
    async fn contains(&self, hash: &BlockHash) -> Result<bool, StorageError>;
}

/// In-memory block store.
#[derive(Default)]
pub struct InMemBlockStore {
    blocks: RwLock<HashMap<BlockHash, Block>>,
}

impl InMemBlockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlockStore for InMemBlockStore {
    async fn put(&self, block: Block) -> Result<(), StorageError> {
        self.blocks.write().insert(block.hash, block);
        Ok(())
    }

    async fn get(&self, hash: &BlockHash) -> Result<Option<Block>, StorageError> {
        Ok(self.blocks.read().get(hash).cloned())
    }

    async fn contains(&self, hash: &BlockHash) -> Result<bool, StorageError> {
        Ok(self.blocks.read().contains_key(hash))
    }
}
