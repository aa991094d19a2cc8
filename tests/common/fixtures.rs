//! Test fixtures for common test scenarios.

use ark_bls12_381::{Bls12_381, Fr};
use hyperproofs::*;
use rand::{rngs::StdRng, SeedableRng};

pub type Backend = Bls12_381;
pub type G1 = <Bls12_381 as ark_ec::pairing::Pairing>::G1;

/// Standard test height: 32 entries
pub const DEFAULT_HEIGHT: u8 = 5;
/// Openings per aggregate proof in the aggregation tests
pub const DEFAULT_TXN_LIMIT: usize = 8;

/// A committed vector with its engine, digest and proof tree
#[allow(dead_code)]
pub struct VcsTestFixture {
    pub vcs: Vcs<Backend>,
    pub trapdoors: Trapdoors<Backend>,
    pub vector: Vec<Fr>,
    pub digest: G1,
    pub tree: DenseProofTree<Backend>,
    pub rng: StdRng,
}

#[allow(dead_code)]
impl VcsTestFixture {
    /// Fixture with the default height and a fixed seed
    pub fn new() -> Self {
        Self::with_config(VcsConfig::new(DEFAULT_HEIGHT).with_txn_limit(DEFAULT_TXN_LIMIT), 1)
    }

    /// Fixture for a custom configuration and seed
    pub fn with_config(config: VcsConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let (vcs, trapdoors) =
            Vcs::<Backend>::setup(&mut rng, config).expect("setup failed");
        let vector: Vec<Fr> = random_vector(&mut rng, vcs.size() as usize);
        let (digest, tree) = vcs.commit_and_open(&vector).expect("commit failed");
        Self {
            vcs,
            trapdoors,
            vector,
            digest,
            tree,
            rng,
        }
    }

    /// Applies `(index, delta)` pairs to the vector, tree and digest
    pub fn apply_updates(&mut self, indices: &[u64], deltas: &[Fr]) -> usize {
        let touched = self
            .vcs
            .update_proof_tree_bulk(&mut self.tree, indices, deltas)
            .expect("bulk update failed");
        self.vcs
            .update_digest_batch(&mut self.digest, indices, deltas)
            .expect("digest update failed");
        for (index, delta) in indices.iter().zip(deltas) {
            self.vector[*index as usize] += delta;
        }
        touched
    }

    /// Claimed values and proofs for `indices`, read from the current tree
    pub fn claims(&self, indices: &[u64]) -> (Vec<Fr>, Vec<Vec<G1>>) {
        let values = indices.iter().map(|i| self.vector[*i as usize]).collect();
        let proofs = indices
            .iter()
            .map(|i| get_proof_path(&self.tree, *i).expect("proof path"))
            .collect();
        (values, proofs)
    }
}
