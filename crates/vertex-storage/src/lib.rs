//! Vertex Storage - Crash-recoverable block DAG storage.
//!
//! The DAG store keeps every accepted block's metadata, the parent and
//! justification relations, per-validator latest messages, and a
//! rank-indexed topological ordering. Two variants share one contract:
//! a persistent store backed by CRC-protected append-only logs with
//! checkpoint rollover, and an in-memory store for tests and tooling.

pub mod block_store;
mod codec;
pub mod config;
pub mod dag_store;
pub mod error;
pub mod in_mem;
mod latest_store;
mod metadata_store;
pub mod representation;
mod state;

pub use block_store::{BlockStore, InMemBlockStore};
pub use config::DagStoreConfig;
pub use dag_store::{BlockDagStore, FileDagStore};
pub use error::StorageError;
pub use in_mem::InMemDagStore;
pub use representation::DagRepresentation;
