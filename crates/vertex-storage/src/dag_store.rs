//! Block DAG façade.
//!
//! All mutations are serialised by one exclusive permit; readers take the
//! permit only long enough to clone a snapshot. If an insert fails while
//! writing to disk, the in-memory state is rolled back so the previous
//! snapshot stays authoritative and the insert can be retried.

use crate::config::DagStoreConfig;
use crate::error::StorageError;
use crate::latest_store::LatestMessagesStore;
use crate::metadata_store::BlockMetadataStore;
use crate::representation::DagRepresentation;
use crate::state::DagState;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::warn;
use vertex_types::Block;

/// The operations every DAG store variant provides.
#[async_trait]
pub trait BlockDagStore: Send + Sync {
    /// Insert a block and return the snapshot that includes it.
    ///
    /// Re-inserting a known hash is a no-op returning the current
    /// snapshot. Fails with [`StorageError::MalformedValidator`] when the
    /// validator field is non-empty and not 32 bytes; nothing is written
    /// in that case.
    async fn insert(&self, block: &Block) -> Result<DagRepresentation, StorageError>;

    /// Capture a consistent snapshot of the current state.
    async fn representation(&self) -> Result<DagRepresentation, StorageError>;

    /// Force a checkpoint rollover (no-op on the in-memory variant).
    async fn checkpoint(&self) -> Result<(), StorageError>;

    /// Atomically empty every store and truncate the backing logs.
    async fn clear(&self) -> Result<(), StorageError>;

    /// Flush and release file handles; later operations fail with
    /// [`StorageError::StoreClosed`].
    async fn close(&self) -> Result<(), StorageError>;
}

struct Backend {
    metadata: BlockMetadataStore,
    latest: LatestMessagesStore,
}

struct Inner {
    state: DagState,
    backend: Option<Backend>,
}

/// Persistent DAG store backed by the metadata and latest-messages logs.
pub struct FileDagStore {
    inner: Mutex<Inner>,
}

impl FileDagStore {
    /// Open the store, replaying checkpoints and logs.
    ///
    /// Corrupt log tails are truncated and tolerated per the codec's
    /// recovery policy; a latest-message entry pointing at a block lost
    /// with a truncated metadata tail is dropped so the rebuilt state
    /// stays internally consistent.
    pub async fn open(config: DagStoreConfig) -> Result<Self, StorageError> {
        let (metadata_store, metas) = BlockMetadataStore::open(&config)?;
        let mut state = DagState::new();
        for meta in metas {
            state.apply_metadata(meta);
        }

        let (latest_store, entries) = LatestMessagesStore::open(&config)?;
        for (validator, hash) in entries {
            if state.contains(&hash) {
                state.set_latest_entry(validator, hash);
            } else {
                warn!(
                    validator = %validator,
                    hash = %hash,
                    "dropping latest message for unknown block"
                );
            }
        }

        Ok(Self {
            inner: Mutex::new(Inner {
                state,
                backend: Some(Backend {
                    metadata: metadata_store,
                    latest: latest_store,
                }),
            }),
        })
    }
}

#[async_trait]
impl BlockDagStore for FileDagStore {
    async fn insert(&self, block: &Block) -> Result<DagRepresentation, StorageError> {
        let inner = &mut *self.inner.lock().await;
        let backend = inner.backend.as_mut().ok_or(StorageError::StoreClosed)?;
        let state = &mut inner.state;

        let author = block.validator_id()?;
        if state.contains(&block.hash) {
            return Ok(state.snapshot());
        }

        let before = state.clone();
        let (meta, updates) = state.apply_block(block, author);

        let persisted = (|| -> Result<(), StorageError> {
            backend.metadata.append(&meta)?;
            for (validator, hash) in &updates {
                backend.latest.append(validator, hash)?;
            }
            backend.latest.maybe_squash(state.latest_map())
        })();

        match persisted {
            Ok(()) => Ok(state.snapshot()),
            Err(e) => {
                *state = before;
                Err(e)
            }
        }
    }

    async fn representation(&self) -> Result<DagRepresentation, StorageError> {
        let inner = self.inner.lock().await;
        if inner.backend.is_none() {
            return Err(StorageError::StoreClosed);
        }
        Ok(inner.state.snapshot())
    }

    async fn checkpoint(&self) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().await;
        let backend = inner.backend.as_mut().ok_or(StorageError::StoreClosed)?;
        backend.metadata.force_roll()
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let inner = &mut *self.inner.lock().await;
        let backend = inner.backend.as_mut().ok_or(StorageError::StoreClosed)?;
        backend.metadata.clear()?;
        backend.latest.clear()?;
        inner.state.clear();
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().await;
        let mut backend = inner.backend.take().ok_or(StorageError::StoreClosed)?;
        backend.metadata.sync()?;
        backend.latest.sync()?;
        Ok(())
    }
}
