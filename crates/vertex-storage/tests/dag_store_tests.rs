//! DAG store scenarios: durability, crash tolerance, checkpointing, and
//! the structural invariants of the representation.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use tempfile::TempDir;
use vertex_storage::config::LATEST_MESSAGES_LOG;
use vertex_storage::{
    BlockDagStore, DagRepresentation, DagStoreConfig, FileDagStore, InMemDagStore, StorageError,
};
use vertex_types::{Block, BlockHash, Bond, Justification, ValidatorId};

fn hash(b: u8) -> BlockHash {
    BlockHash::from_bytes([b; 32])
}

fn validator(b: u8) -> ValidatorId {
    ValidatorId::from_bytes([b; 32])
}

fn val_bytes(b: u8) -> Vec<u8> {
    vec![b; 32]
}

/// Check the five structural invariants of a snapshot whose blocks all
/// have known parents.
fn check_invariants(snap: &DagRepresentation) {
    for (parent, kids) in snap.children_iter() {
        assert!(snap.contains(parent), "children key not in metadata");
        for kid in kids {
            assert!(
                snap.lookup(kid).unwrap().parents.contains(parent),
                "child edge without parent edge"
            );
        }
    }
    for (justified, by) in snap.justified_by_iter() {
        assert!(snap.contains(justified), "justified_by key not in metadata");
        for h in by {
            assert!(
                snap.lookup(h)
                    .unwrap()
                    .justifications
                    .iter()
                    .any(|j| j.latest_hash == *justified),
                "justified_by edge without justification"
            );
        }
    }

    let mut seen = HashSet::new();
    for (rank, level) in snap.topo_sort(0).iter().enumerate() {
        for h in level {
            assert!(seen.insert(*h), "block appears in two ranks");
            let meta = snap.lookup(h).expect("topo hash not in metadata");
            assert_eq!(meta.rank, rank as u64, "topo position disagrees with rank");
        }
    }
    for (h, meta) in snap.metadata_iter() {
        assert!(seen.contains(h), "metadata block missing from topo");
        // Forward edges imply inverse edges.
        for parent in &meta.parents {
            assert!(
                snap.children(parent).map_or(false, |c| c.contains(h)),
                "parent edge without child edge"
            );
        }
        // Rank rule over known parents.
        let expected = meta
            .parents
            .iter()
            .filter_map(|p| snap.lookup(p))
            .map(|m| m.rank)
            .max()
            .map(|r| r + 1)
            .unwrap_or(0);
        assert_eq!(meta.rank, expected);
    }

    for (v, h) in snap.latest_message_hashes() {
        let meta = snap.lookup(h).expect("latest hash not in metadata");
        let inherited = meta.bonded_validators.contains(v)
            && !meta.justifications.iter().any(|j| j.validator == *v);
        assert!(
            meta.validator == Some(*v) || inherited,
            "latest message neither authored nor inherited"
        );
    }
}

#[tokio::test]
async fn linear_chain_of_three() {
    let store = InMemDagStore::new();
    store.insert(&Block::new(hash(1), vec![], val_bytes(b'A'))).await.unwrap();
    store
        .insert(&Block::new(hash(2), vec![hash(1)], val_bytes(b'B')))
        .await
        .unwrap();
    let snap = store
        .insert(&Block::new(hash(3), vec![hash(2)], val_bytes(b'A')))
        .await
        .unwrap();

    assert_eq!(snap.latest_message_hash(&validator(b'A')), Some(&hash(3)));
    assert_eq!(snap.latest_message_hash(&validator(b'B')), Some(&hash(2)));
    assert_eq!(snap.latest_message_hashes().len(), 2);

    let topo = snap.topo_sort(0);
    assert_eq!(topo.len(), 3);
    for (rank, expected) in [hash(1), hash(2), hash(3)].iter().enumerate() {
        let level: Vec<_> = topo.get(rank).unwrap().iter().copied().collect();
        assert_eq!(level, vec![*expected]);
    }

    assert!(snap.children(&hash(1)).unwrap().contains(&hash(2)));
    assert!(snap.children(&hash(2)).unwrap().contains(&hash(3)));
    assert!(snap.children(&hash(3)).is_none());
    check_invariants(&snap);
}

#[tokio::test]
async fn genesis_with_empty_validator() {
    let store = InMemDagStore::new();
    store.insert(&Block::new(hash(1), vec![], Vec::new())).await.unwrap();
    let snap = store
        .insert(&Block::new(hash(2), vec![hash(1)], val_bytes(b'A')))
        .await
        .unwrap();

    assert_eq!(snap.latest_message_hashes().len(), 1);
    assert_eq!(snap.latest_message_hash(&validator(b'A')), Some(&hash(2)));
    assert!(snap.contains(&hash(1)));
    assert_eq!(snap.lookup(&hash(1)).unwrap().rank, 0);
    assert_eq!(snap.lookup(&hash(1)).unwrap().validator, None);
    assert_eq!(snap.lookup(&hash(2)).unwrap().rank, 1);
    check_invariants(&snap);
}

#[tokio::test]
async fn crash_tolerance_garbage_after_close() {
    let dir = TempDir::new().unwrap();
    let config = DagStoreConfig::new(dir.path());

    let before = {
        let store = FileDagStore::open(config.clone()).await.unwrap();
        store.insert(&Block::new(hash(1), vec![], val_bytes(b'A'))).await.unwrap();
        store
            .insert(&Block::new(hash(2), vec![hash(1)], val_bytes(b'B')))
            .await
            .unwrap();
        let snap = store
            .insert(&Block::new(hash(3), vec![hash(2)], val_bytes(b'A')))
            .await
            .unwrap();
        store.close().await.unwrap();
        snap
    };

    let mut file = OpenOptions::new()
        .append(true)
        .open(dir.path().join(LATEST_MESSAGES_LOG))
        .unwrap();
    file.write_all(&[0xDE, 0xAD, 0xBE, 0xEF].repeat(16)).unwrap();
    drop(file);

    let store = FileDagStore::open(config).await.unwrap();
    let after = store.representation().await.unwrap();
    assert_eq!(after, before);
    check_invariants(&after);
}

#[tokio::test]
async fn durability_roundtrip() {
    let dir = TempDir::new().unwrap();
    let config = DagStoreConfig::new(dir.path());

    let before = {
        let store = FileDagStore::open(config.clone()).await.unwrap();
        let genesis = Block::new(hash(1), vec![], Vec::new())
            .with_bonds(vec![Bond::new(validator(b'A'), 10), Bond::new(validator(b'B'), 5)]);
        store.insert(&genesis).await.unwrap();
        let b2 = Block::new(hash(2), vec![hash(1)], val_bytes(b'A'))
            .with_justifications(vec![Justification::new(validator(b'B'), hash(1))]);
        let snap = store.insert(&b2).await.unwrap();
        store.close().await.unwrap();
        snap
    };

    let store = FileDagStore::open(config).await.unwrap();
    let after = store.representation().await.unwrap();
    assert_eq!(after, before);
    check_invariants(&after);
}

#[tokio::test]
async fn checkpoint_rollover_and_reopen() {
    let dir = TempDir::new().unwrap();
    let config = DagStoreConfig::new(dir.path())
        .with_max_size_factor(2)
        .with_checkpoint_size_bytes(64);

    let before = {
        let store = FileDagStore::open(config.clone()).await.unwrap();
        let mut snap = store.insert(&Block::new(hash(0), vec![], val_bytes(b'A'))).await.unwrap();
        for i in 1..10u8 {
            snap = store
                .insert(&Block::new(hash(i), vec![hash(i - 1)], val_bytes(b'A')))
                .await
                .unwrap();
        }
        store.close().await.unwrap();
        snap
    };

    let names: Vec<String> = std::fs::read_dir(dir.path().join("checkpoints"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names.iter().any(|n| n.starts_with("0-")), "no 0-<k> checkpoint in {names:?}");

    let store = FileDagStore::open(config).await.unwrap();
    let after = store.representation().await.unwrap();
    assert_eq!(after, before);
    check_invariants(&after);
}

#[tokio::test]
async fn forced_checkpoint_preserves_state() {
    let dir = TempDir::new().unwrap();
    let config = DagStoreConfig::new(dir.path());

    let store = FileDagStore::open(config.clone()).await.unwrap();
    store.insert(&Block::new(hash(1), vec![], val_bytes(b'A'))).await.unwrap();
    store.checkpoint().await.unwrap();
    let snap = store
        .insert(&Block::new(hash(2), vec![hash(1)], val_bytes(b'B')))
        .await
        .unwrap();
    store.close().await.unwrap();

    let store = FileDagStore::open(config).await.unwrap();
    assert_eq!(store.representation().await.unwrap(), snap);
}

#[tokio::test]
async fn squashes_and_checkpoints_do_not_change_state() {
    // Same inserts against a store that never rolls and one that rolls
    // constantly; final states must match.
    let dir_plain = TempDir::new().unwrap();
    let dir_rolling = TempDir::new().unwrap();
    let plain = FileDagStore::open(DagStoreConfig::new(dir_plain.path())).await.unwrap();
    let rolling_config = DagStoreConfig::new(dir_rolling.path())
        .with_max_size_factor(1)
        .with_checkpoint_size_bytes(32);
    let rolling = FileDagStore::open(rolling_config.clone()).await.unwrap();

    let mut prev = None;
    for i in 0..20u8 {
        let parents = prev.map(|p| vec![p]).unwrap_or_default();
        let block = Block::new(hash(i), parents, val_bytes(b'A' + (i % 3)));
        plain.insert(&block).await.unwrap();
        rolling.insert(&block).await.unwrap();
        prev = Some(hash(i));
    }

    let expected = plain.representation().await.unwrap();
    assert_eq!(rolling.representation().await.unwrap(), expected);

    // And the rolled store still recovers to the same state.
    rolling.close().await.unwrap();
    let reopened = FileDagStore::open(rolling_config).await.unwrap();
    assert_eq!(reopened.representation().await.unwrap(), expected);
}

#[tokio::test]
async fn clear_empties_persistent_store() {
    let dir = TempDir::new().unwrap();
    let config = DagStoreConfig::new(dir.path());

    let store = FileDagStore::open(config.clone()).await.unwrap();
    store.insert(&Block::new(hash(1), vec![], val_bytes(b'A'))).await.unwrap();
    store.insert(&Block::new(hash(2), vec![hash(1)], val_bytes(b'B'))).await.unwrap();
    store.clear().await.unwrap();

    let snap = store.representation().await.unwrap();
    assert!(snap.is_empty());
    assert!(!snap.contains(&hash(1)));
    assert!(!snap.contains(&hash(2)));
    assert!(snap.latest_message_hashes().is_empty());
    assert_eq!(snap.topo_sort(0).len(), 0);

    // Emptiness survives a reopen.
    store.close().await.unwrap();
    let store = FileDagStore::open(config).await.unwrap();
    assert!(store.representation().await.unwrap().is_empty());
}

#[tokio::test]
async fn insert_after_clear_starts_from_rank_zero() {
    let dir = TempDir::new().unwrap();
    let store = FileDagStore::open(DagStoreConfig::new(dir.path())).await.unwrap();
    store.insert(&Block::new(hash(1), vec![], val_bytes(b'A'))).await.unwrap();
    store.clear().await.unwrap();

    let snap = store.insert(&Block::new(hash(9), vec![], val_bytes(b'B'))).await.unwrap();
    assert_eq!(snap.block_count(), 1);
    assert_eq!(snap.lookup(&hash(9)).unwrap().rank, 0);
}

#[tokio::test]
async fn malformed_validator_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = FileDagStore::open(DagStoreConfig::new(dir.path())).await.unwrap();
    let err = store
        .insert(&Block::new(hash(1), vec![], vec![b'X'; 16]))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::MalformedValidator { actual: 16 }));
    assert!(store.representation().await.unwrap().is_empty());
}

#[tokio::test]
async fn derive_ordering_follows_rank_then_insertion() {
    let store = InMemDagStore::new();
    store.insert(&Block::new(hash(1), vec![], val_bytes(b'A'))).await.unwrap();
    store.insert(&Block::new(hash(2), vec![], val_bytes(b'B'))).await.unwrap();
    store
        .insert(&Block::new(hash(3), vec![hash(1), hash(2)], val_bytes(b'A')))
        .await
        .unwrap();
    let snap = store
        .insert(&Block::new(hash(4), vec![hash(3)], val_bytes(b'B')))
        .await
        .unwrap();

    assert_eq!(snap.derive_ordering(0), vec![hash(1), hash(2), hash(3), hash(4)]);
    assert_eq!(snap.derive_ordering(1), vec![hash(3), hash(4)]);
    assert_eq!(snap.topo_sort_tail(1).len(), 1);
    assert_eq!(
        snap.topo_sort_range(1, 2)
            .iter()
            .flat_map(|level| level.iter().copied())
            .collect::<Vec<_>>(),
        vec![hash(3), hash(4)]
    );
}

mod random_graphs {
    use super::*;
    use proptest::prelude::*;

    /// Deterministically derive a small block graph from random words and
    /// insert it; the snapshot must satisfy every structural invariant.
    fn build_blocks(seeds: &[u64]) -> Vec<Block> {
        let mut blocks = Vec::new();
        for (i, seed) in seeds.iter().enumerate() {
            let mut parents: Vec<BlockHash> = Vec::new();
            if i > 0 {
                let count = (seed % 3) as usize;
                for k in 0..count.min(i) {
                    let idx = ((seed >> (8 * k)) as usize + k) % i;
                    let parent = hash(idx as u8);
                    if !parents.contains(&parent) {
                        parents.push(parent);
                    }
                }
            }
            let validator_sel = (seed >> 32) % 5;
            let validator_field = if validator_sel == 4 {
                Vec::new()
            } else {
                val_bytes(b'A' + validator_sel as u8)
            };
            let mut block = Block::new(hash(i as u8), parents, validator_field);
            if seed % 4 == 0 {
                block = block.with_bonds(vec![
                    Bond::new(validator(b'A'), 10),
                    Bond::new(validator(b'B'), 20),
                ]);
            }
            if i > 0 && seed % 3 == 0 {
                let target = hash(((seed >> 16) as usize % i) as u8);
                block = block
                    .with_justifications(vec![Justification::new(
                        validator(b'A' + ((seed >> 24) % 4) as u8),
                        target,
                    )]);
            }
            blocks.push(block);
        }
        blocks
    }

    proptest! {
        #[test]
        fn p1_invariants_hold_for_random_graphs(seeds in prop::collection::vec(any::<u64>(), 1..40)) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let store = InMemDagStore::new();
                let mut snap = store.representation().await.unwrap();
                for block in build_blocks(&seeds) {
                    snap = store.insert(&block).await.unwrap();
                }
                check_invariants(&snap);
            });
        }

        #[test]
        fn p2_random_graphs_survive_reopen(seeds in prop::collection::vec(any::<u64>(), 1..20)) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let dir = TempDir::new().unwrap();
                let config = DagStoreConfig::new(dir.path())
                    .with_max_size_factor(2)
                    .with_checkpoint_size_bytes(64);
                let store = FileDagStore::open(config.clone()).await.unwrap();
                for block in build_blocks(&seeds) {
                    store.insert(&block).await.unwrap();
                }
                let before = store.representation().await.unwrap();
                store.close().await.unwrap();

                let reopened = FileDagStore::open(config).await.unwrap();
                let after = reopened.representation().await.unwrap();
                assert_eq!(after, before);
                check_invariants(&after);
            });
        }
    }
}
