//! Helper functions for test assertions and common operations.

use std::path::PathBuf;

use hyperproofs::*;

use super::fixtures::{Backend, G1};

/// Fresh, empty directory under the system temp dir
#[allow(dead_code)]
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hyperproofs-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

/// Asserts that every claim verifies on its own and as a memoized batch
#[allow(dead_code)]
pub fn assert_all_verify(
    vcs: &Vcs<Backend>,
    digest: &G1,
    indices: &[u64],
    values: &[<Backend as ark_ec::pairing::Pairing>::ScalarField],
    proofs: &[Vec<G1>],
) {
    for ((index, value), proof) in indices.iter().zip(values).zip(proofs) {
        assert!(
            vcs.verify(digest, *index, value, proof).expect("verify"),
            "opening of index {} did not verify",
            index
        );
    }
    let outcome = vcs
        .verify_memoized(digest, indices, values, proofs)
        .expect("memoized verify");
    assert!(outcome.valid, "memoized batch did not verify");
}
