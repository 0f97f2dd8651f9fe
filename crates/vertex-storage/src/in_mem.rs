//! In-memory DAG store.
//!
//! Same contract as the persistent variant, minus durability: `checkpoint`
//! is a no-op and nothing survives the process. Shares the insert and
//! query logic through [`DagState`].
//!
//! [`DagState`]: crate::state::DagState

use crate::dag_store::BlockDagStore;
use crate::error::StorageError;
use crate::representation::DagRepresentation;
use crate::state::DagState;
use async_trait::async_trait;
use tokio::sync::Mutex;
use vertex_types::Block;

struct Inner {
    state: DagState,
    closed: bool,
}

#[derive(Default)]
pub struct InMemDagStore {
    inner: Mutex<Inner>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            state: DagState::new(),
            closed: false,
        }
    }
}

impl InMemDagStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlockDagStore for InMemDagStore {
    async fn insert(&self, block: &Block) -> Result<DagRepresentation, StorageError> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Err(StorageError::StoreClosed);
        }
        let author = block.validator_id()?;
        if !inner.state.contains(&block.hash) {
            inner.state.apply_block(block, author);
        }
        Ok(inner.state.snapshot())
    }

    async fn representation(&self) -> Result<DagRepresentation, StorageError> {
        let inner = self.inner.lock().await;
        if inner.closed {
            return Err(StorageError::StoreClosed);
        }
        Ok(inner.state.snapshot())
    }

    async fn checkpoint(&self) -> Result<(), StorageError> {
        let inner = self.inner.lock().await;
        if inner.closed {
            return Err(StorageError::StoreClosed);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Err(StorageError::StoreClosed);
        }
        inner.state.clear();
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Err(StorageError::StoreClosed);
        }
        inner.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vertex_types::BlockHash;

    fn hash(b: u8) -> BlockHash {
        BlockHash::from_bytes([b; 32])
    }

    #[tokio::test]
    async fn test_insert_and_query() {
        let store = InMemDagStore::new();
        store
            .insert(&Block::new(hash(1), vec![], vec![b'A'; 32]))
            .await
            .unwrap();
        let snap = store
            .insert(&Block::new(hash(2), vec![hash(1)], vec![b'B'; 32]))
            .await
            .unwrap();

        assert!(snap.contains(&hash(1)));
        assert_eq!(snap.lookup(&hash(2)).unwrap().rank, 1);
    }

    #[tokio::test]
    async fn test_clear_empties_everything() {
        let store = InMemDagStore::new();
        store
            .insert(&Block::new(hash(1), vec![], vec![b'A'; 32]))
            .await
            .unwrap();
        store.clear().await.unwrap();

        let snap = store.representation().await.unwrap();
        assert!(snap.is_empty());
        assert!(!snap.contains(&hash(1)));
    }

    #[tokio::test]
    async fn test_checkpoint_is_noop() {
        let store = InMemDagStore::new();
        store.checkpoint().await.unwrap();
        store.close().await.unwrap();
        assert!(matches!(
            store.checkpoint().await,
            Err(StorageError::StoreClosed)
        ));
    }
}
