//! End-to-end flows across commitment, update, verification, aggregation
//! and persistence.

mod common;

use std::fs::OpenOptions;

use ark_bls12_381::Fr;
use common::*;
use hyperproofs::*;
use rand::{rngs::StdRng, SeedableRng};

#[test]
fn test_commit_update_verify_flow() {
    let mut fx = VcsTestFixture::new();
    let size = fx.vcs.size();

    let indices = random_indices(&mut fx.rng, DEFAULT_HEIGHT, 10);
    let deltas: Vec<Fr> = random_vector(&mut fx.rng, indices.len());
    let touched = fx.apply_updates(&indices, &deltas);
    assert!(touched > 0);
    assert!(touched <= indices.len() * DEFAULT_HEIGHT as usize);

    // Incremental state equals a fresh commitment of the updated vector.
    let (digest, tree) = fx.vcs.commit_and_open(&fx.vector).expect("recommit");
    assert_eq!(digest, fx.digest);
    assert_eq!(tree, fx.tree);

    let all: Vec<u64> = (0..size).collect();
    let (values, proofs) = fx.claims(&all);
    assert_all_verify(&fx.vcs, &fx.digest, &all, &values, &proofs);
}

#[test]
fn test_aggregation_roundtrip() {
    let mut fx = VcsTestFixture::with_config(VcsConfig::new(4).with_txn_limit(8), 2);
    let indices = random_indices(&mut fx.rng, 4, 8);
    let (values, proofs) = fx.claims(&indices);

    let adapter = AggregationAdapter::new(
        8,
        fx.vcs.params().clone(),
        fx.vcs.verification_key().clone(),
        TransparentAggregator,
        [7u8; 32],
    )
    .expect("adapter");
    assert_eq!(adapter.shape().padded_size, 32);
    assert_eq!(adapter.shape().rows, 8);

    let proof = adapter.agg_prove(&indices, &proofs).expect("agg prove");
    assert!(adapter
        .agg_verify(&proof, &fx.digest, &indices, &values)
        .expect("agg verify"));

    let mut corrupted = values.clone();
    corrupted[3] += Fr::from(1u64);
    assert!(!adapter
        .agg_verify(&proof, &fx.digest, &indices, &corrupted)
        .expect("agg verify"));

    assert!(matches!(
        adapter.agg_prove(&indices[..7], &proofs[..7]),
        Err(VcsError::SizeMismatch { expected: 8, found: 7, .. })
    ));
    assert!(matches!(
        adapter.agg_verify(&proof, &fx.digest, &indices, &values[..5]),
        Err(VcsError::SizeMismatch { .. })
    ));
}

#[test]
fn test_persistence_roundtrip() {
    let dir = scratch_dir("flow-persist");
    let config = VcsConfig::new(DEFAULT_HEIGHT)
        .with_shards(4, 2)
        .with_key_dir(&dir);
    let fx = VcsTestFixture::with_config(config.clone(), 3);
    fx.vcs.save().expect("save");

    let loaded = Vcs::<Backend>::load(config.clone()).expect("load");
    assert_eq!(loaded.params(), fx.vcs.params());
    assert_eq!(loaded.verification_key(), fx.vcs.verification_key());
    assert_eq!(
        loaded.opening_key().expect("upk"),
        fx.vcs.opening_key().expect("upk")
    );
    let (digest, tree) = loaded.commit_and_open(&fx.vector).expect("commit");
    assert_eq!(digest, fx.digest);
    assert_eq!(tree, fx.tree);

    // A smaller height reads the prefix of the stored key.
    let smaller = Vcs::<Backend>::load(config.clone().with_height(3)).expect("load prefix");
    assert_eq!(smaller.size(), 8);

    let vrk_path = dir.join(VRK_FILE);
    let len = std::fs::metadata(&vrk_path).expect("metadata").len();
    OpenOptions::new()
        .write(true)
        .open(&vrk_path)
        .and_then(|file| file.set_len(len / 2))
        .expect("truncate");
    assert!(matches!(
        Vcs::<Backend>::load_without_opening_key(config),
        Err(VcsError::KeyMaterialIncomplete { .. })
    ));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_simulated_large_instance() {
    let height = 20u8;
    let count = 8usize;
    let mut rng = StdRng::seed_from_u64(4);
    let (vcs, trapdoors) =
        Vcs::<Backend>::setup_without_opening_key(&mut rng, VcsConfig::new(height))
            .expect("setup");
    let mut inst =
        simulate_sparse_instance(vcs.params(), &trapdoors, &mut rng, count).expect("simulate");
    assert_all_verify(&vcs, &inst.digest, &inst.indices, &inst.values, &inst.proofs);

    // Updates at sampled positions only touch materialized nodes.
    let updates: Vec<u64> = inst.indices.iter().take(4).copied().collect();
    let deltas: Vec<Fr> = random_vector(&mut rng, updates.len());
    vcs.update_proof_tree_bulk_with(&inst.opening_keys, &mut inst.tree, &updates, &deltas)
        .expect("bulk update");
    vcs.update_digest_batch_with(&inst.opening_keys, &mut inst.digest, &updates, &deltas)
        .expect("digest update");
    for (index, delta) in updates.iter().zip(&deltas) {
        for (claimed, value) in inst.indices.iter().zip(inst.values.iter_mut()) {
            if claimed == index {
                *value += delta;
            }
        }
    }
    let proofs: Vec<Vec<G1>> = inst
        .indices
        .iter()
        .map(|index| get_proof_path(&inst.tree, *index).expect("proof path"))
        .collect();
    let outcome = vcs
        .verify_memoized(&inst.digest, &inst.indices, &inst.values, &proofs)
        .expect("memoized verify");
    assert!(outcome.valid);

    let adapter = AggregationAdapter::new(
        count,
        vcs.params().clone(),
        vcs.verification_key().clone(),
        TransparentAggregator,
        [9u8; 32],
    )
    .expect("adapter");
    let proof = adapter.agg_prove(&inst.indices, &proofs).expect("agg prove");
    assert!(adapter
        .agg_verify(&proof, &inst.digest, &inst.indices, &inst.values)
        .expect("agg verify"));
}

#[test]
fn test_opening_path_checks() {
    let mut fx = VcsTestFixture::new();
    let upk = fx.vcs.opening_key().expect("upk").clone();
    for index in [0u64, 13, 31] {
        let path = upk.opening_path(index).expect("path");
        assert!(fx
            .vcs
            .verify_opening_path(index, &path, &mut fx.rng)
            .expect("path check"));

        let mut tampered = path.clone();
        tampered.swap(0, 1);
        assert!(!fx
            .vcs
            .verify_opening_path(index, &tampered, &mut fx.rng)
            .expect("path check"));
    }

    // A map of paths serves updates like the full key.
    let held = [4u64, 30];
    let source: std::collections::HashMap<u64, _> = held
        .iter()
        .map(|index| (*index, upk.opening_path(*index).expect("path")))
        .collect();
    let delta = Fr::from(5u64);
    let mut via_map = fx.tree.clone();
    fx.vcs
        .update_proof_tree_with(&source, &mut via_map, 30, &delta)
        .expect("update via map");
    fx.vcs
        .update_proof_tree(&mut fx.tree, 30, &delta)
        .expect("update via key");
    assert_eq!(via_map, fx.tree);
}

#[test]
fn test_json_bundle_roundtrip() {
    let fx = VcsTestFixture::new();
    let indices = [1u64, 2, 3, 31];
    let (values, proofs) = fx.claims(&indices);
    let openings = indices
        .iter()
        .zip(values)
        .zip(proofs)
        .map(|((index, value), proof)| Opening {
            index: *index,
            value,
            proof,
        })
        .collect();
    let bundle = OpeningBundle::<Backend>::new(DEFAULT_HEIGHT, fx.digest, openings);

    let json = serde_json::to_string(&bundle).expect("serialize");
    let decoded: OpeningBundle<Backend> = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded.digest, fx.digest);
    assert_eq!(decoded.openings.len(), 4);
    assert!(decoded.verify(&fx.vcs).expect("bundle verify"));

    let mut forged = decoded;
    forged.openings[0].value += Fr::from(1u64);
    assert!(!forged.verify(&fx.vcs).expect("bundle verify"));
}
