use std::collections::HashSet;

use ark_bls12_381::{Bls12_381, Fr};
use ark_ff::UniformRand;
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::*;

type G1 = <Bls12_381 as ark_ec::pairing::Pairing>::G1;

fn setup(height: u8, seed: u64) -> (Vcs<Bls12_381>, StdRng) {
    let mut rng = StdRng::seed_from_u64(seed);
    let (vcs, _) = Vcs::<Bls12_381>::setup(&mut rng, VcsConfig::new(height)).unwrap();
    (vcs, rng)
}

fn proofs_for(tree: &DenseProofTree<Bls12_381>, indices: &[u64]) -> Vec<Vec<G1>> {
    indices
        .iter()
        .map(|i| get_proof_path(tree, *i).unwrap())
        .collect()
}

#[test]
fn every_opening_verifies_for_small_trees() {
    for height in 4..=5u8 {
        let (vcs, mut rng) = setup(height, height as u64);
        let vector: Vec<Fr> = random_vector(&mut rng, 1 << height);
        let (digest, tree) = vcs.commit_and_open(&vector).unwrap();
        for index in 0..1u64 << height {
            let proof = get_proof_path(&tree, index).unwrap();
            assert!(
                vcs.verify(&digest, index, &vector[index as usize], &proof)
                    .unwrap(),
                "height {} index {}",
                height,
                index
            );
        }
    }
}

#[test]
fn every_opening_verifies_up_to_height_ten() {
    for height in 6..=10u8 {
        let (vcs, mut rng) = setup(height, 100 + height as u64);
        let vector: Vec<Fr> = random_vector(&mut rng, 1 << height);
        let (digest, tree) = vcs.commit_and_open(&vector).unwrap();
        for index in 0..1u64 << height {
            let proof = get_proof_path(&tree, index).unwrap();
            assert!(
                vcs.verify(&digest, index, &vector[index as usize], &proof)
                    .unwrap(),
                "height {} index {}",
                height,
                index
            );
        }
    }
}

#[test]
fn bulk_update_equals_sequential_updates() {
    let (vcs, mut rng) = setup(6, 200);
    let vector: Vec<Fr> = random_vector(&mut rng, 64);
    let (digest, tree) = vcs.commit_and_open(&vector).unwrap();

    // Duplicates on purpose.
    let indices = vec![3u64, 17, 3, 63, 0, 17, 40, 41];
    let deltas: Vec<Fr> = random_vector(&mut rng, indices.len());

    let mut bulk_tree = tree.clone();
    let mut bulk_digest = digest;
    vcs.update_proof_tree_bulk(&mut bulk_tree, &indices, &deltas)
        .unwrap();
    vcs.update_digest_batch(&mut bulk_digest, &indices, &deltas)
        .unwrap();

    let mut seq_tree = tree;
    let mut seq_digest = digest;
    for (index, delta) in indices.iter().zip(&deltas) {
        vcs.update_proof_tree(&mut seq_tree, *index, delta).unwrap();
        vcs.update_digest(&mut seq_digest, *index, delta).unwrap();
    }

    assert_eq!(bulk_tree, seq_tree);
    assert_eq!(bulk_digest, seq_digest);
}

#[test]
fn updated_proofs_verify_in_a_batch() {
    let (vcs, mut rng) = setup(7, 300);
    let mut vector: Vec<Fr> = random_vector(&mut rng, 128);
    let (mut digest, mut tree) = vcs.commit_and_open(&vector).unwrap();
    let original_digest = digest;

    let indices = random_indices(&mut rng, 7, 20);
    let deltas: Vec<Fr> = random_vector(&mut rng, indices.len());
    vcs.update_proof_tree_bulk(&mut tree, &indices, &deltas)
        .unwrap();
    vcs.update_digest_batch(&mut digest, &indices, &deltas)
        .unwrap();
    for (index, delta) in indices.iter().zip(&deltas) {
        vector[*index as usize] += delta;
    }

    let mut claimed = indices.clone();
    claimed.extend(random_indices(&mut rng, 7, 10));
    let values: Vec<Fr> = claimed.iter().map(|i| vector[*i as usize]).collect();
    let proofs = proofs_for(&tree, &claimed);
    let outcome = vcs
        .verify_memoized(&digest, &claimed, &values, &proofs)
        .unwrap();
    assert!(outcome.valid);

    // The digest from before the updates no longer matches.
    assert!(
        !vcs.verify_memoized(&original_digest, &claimed, &values, &proofs)
            .unwrap()
            .valid
    );
}

#[test]
fn memoization_shares_subtree_pairings() {
    let height = 6u8;
    let (vcs, mut rng) = setup(height, 400);
    let vector: Vec<Fr> = random_vector(&mut rng, 64);
    let (digest, tree) = vcs.commit_and_open(&vector).unwrap();

    // All eight claims live under node (3, 5).
    let claimed: Vec<u64> = (40..48).collect();
    let values: Vec<Fr> = claimed.iter().map(|i| vector[*i as usize]).collect();
    let proofs = proofs_for(&tree, &claimed);
    let outcome = vcs
        .verify_memoized(&digest, &claimed, &values, &proofs)
        .unwrap();

    let distinct: HashSet<TreeAddress> = claimed
        .iter()
        .flat_map(|index| {
            (1..=height).map(move |level| TreeAddress::new(level, index >> (height - level)))
        })
        .collect();
    assert!(outcome.valid);
    assert_eq!(outcome.unique_nodes, distinct.len());
    assert_eq!(outcome.unique_nodes, 8 + 4 + 2 + 1 + 1 + 1);
    assert!(outcome.unique_nodes < claimed.len() * height as usize);
}

#[test]
fn held_proof_update_matches_updated_tree() {
    let (vcs, mut rng) = setup(5, 500);
    let vector: Vec<Fr> = random_vector(&mut rng, 32);
    let (_, mut tree) = vcs.commit_and_open(&vector).unwrap();
    let held: Vec<u64> = vec![0, 9, 21, 31];
    let mut proofs = proofs_for(&tree, &held);

    for _ in 0..6 {
        let index = rng.gen_range(0..32u64);
        let delta = Fr::rand(&mut rng);
        vcs.update_proof_tree(&mut tree, index, &delta).unwrap();
        for (local, proof) in held.iter().zip(proofs.iter_mut()) {
            *proof = vcs.update_proof(proof, *local, index, &delta).unwrap();
        }
    }
    assert_eq!(proofs, proofs_for(&tree, &held));
}

#[test]
fn malformed_inputs_are_rejected() {
    let (vcs, mut rng) = setup(4, 600);
    let vector: Vec<Fr> = random_vector(&mut rng, 16);
    let (digest, tree) = vcs.commit_and_open(&vector).unwrap();
    let proof = get_proof_path(&tree, 2).unwrap();

    let mut long = proof.clone();
    long.push(digest);
    assert!(matches!(
        vcs.verify(&digest, 2, &vector[2], &long),
        Err(VcsError::SizeMismatch { expected: 4, found: 5, .. })
    ));
    assert!(matches!(
        vcs.update_proof(&proof, 2, 16, &Fr::from(1u64)),
        Err(VcsError::Domain(_))
    ));
    assert!(matches!(
        vcs.update_digest_batch(&mut digest.clone(), &[1, 2], &[Fr::from(1u64)]),
        Err(VcsError::SizeMismatch { .. })
    ));
    assert!(matches!(
        vcs.digest(&vector[..8]),
        Err(VcsError::SizeMismatch { .. })
    ));

    assert!(matches!(
        OpeningKey::<Bls12_381>::from_level_order(64, Vec::new()),
        Err(VcsError::Domain(_))
    ));
    assert!(matches!(
        OpeningKey::<Bls12_381>::from_level_order(0, Vec::new()),
        Err(VcsError::Domain(_))
    ));

    let mut other_height = DenseProofTree::<Bls12_381>::new(3);
    assert!(matches!(
        vcs.update_proof_tree(&mut other_height, 1, &Fr::from(1u64)),
        Err(VcsError::Domain(_))
    ));
}

#[test]
fn engine_without_opening_key_still_verifies() {
    let mut rng = StdRng::seed_from_u64(700);
    let config = VcsConfig::new(4);
    let (full, trapdoors) = Vcs::<Bls12_381>::setup(&mut rng, config.clone()).unwrap();
    let vector: Vec<Fr> = random_vector(&mut rng, 16);
    let (digest, tree) = full.commit_and_open(&vector).unwrap();

    let light = Vcs::from_trapdoors(config, full.params().clone(), &trapdoors, false).unwrap();
    assert!(!light.has_opening_key());
    assert!(matches!(
        light.digest(&vector),
        Err(VcsError::KeyMaterialIncomplete { .. })
    ));
    let proof = get_proof_path(&tree, 11).unwrap();
    assert!(light.verify(&digest, 11, &vector[11], &proof).unwrap());

    // Paths derived from trapdoors match the dense key.
    let source = TrapdoorPathSource {
        params: full.params(),
        trapdoors: &trapdoors,
    };
    let upk = full.opening_key().unwrap();
    for index in [0u64, 5, 15] {
        assert_eq!(
            source.opening_path(index).unwrap(),
            upk.opening_path(index).unwrap()
        );
    }
}
