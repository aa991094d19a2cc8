//! Opening verification.
//!
//! An opening `(index, value, proof)` against `digest` is valid iff
//!
//! ```text
//! prod_i e(proof[i], bit_i(index) ? H^{s_i - 1} : H^{s_i}) * e(G^value - digest, H) == 1
//! ```
//!
//! The left-hand product is evaluated as one multi-Miller loop followed by a
//! single final exponentiation.

use std::collections::HashMap;

use ark_ec::pairing::{MillerLoopOutput, Pairing};
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{One, UniformRand, Zero};
use rand_core::RngCore;
use tracing::{debug, instrument};

use crate::tree::{to_binary, TreeAddress};
use crate::{Vcs, VcsError};

/// Outcome of [`Vcs::verify_memoized`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoizedVerification {
    /// Every claim in the batch verified
    pub valid: bool,
    /// Number of distinct partial pairings computed
    pub unique_nodes: usize,
}

impl<E: Pairing> Vcs<E> {
    /// Verifies a single opening.
    ///
    /// # Arguments
    ///
    /// * `digest` - Commitment to the whole vector
    /// * `index` - Position being opened
    /// * `value` - Claimed entry at `index`
    /// * `proof` - `L` proof elements, leaf-adjacent first
    ///
    /// # Returns
    ///
    /// `Ok(true)` if the opening is valid, `Ok(false)` otherwise.
    ///
    /// # Errors
    ///
    /// - [`VcsError::SizeMismatch`] if `proof.len() != L`
    /// - [`VcsError::Domain`] if `index` is out of range
    #[instrument(level = "debug", skip_all, fields(index))]
    pub fn verify(
        &self,
        digest: &E::G1,
        index: u64,
        value: &E::ScalarField,
        proof: &[E::G1],
    ) -> Result<bool, VcsError> {
        self.check_claim(index, proof)?;
        let bits = to_binary(index, self.params.height);

        let mut g1 = proof.to_vec();
        g1.push(self.closing_term(digest, value));
        let g1 = E::G1::normalize_batch(&g1);

        let mut g2: Vec<E::G2Affine> = bits
            .iter()
            .enumerate()
            .map(|(level, bit)| self.vrk.select(level, *bit))
            .collect();
        g2.push(self.params.h);

        Ok(is_identity(E::multi_miller_loop(g1, g2)))
    }

    /// Verifies many openings against one digest, sharing work between them.
    ///
    /// Claims under a common subtree pair the same proof element with the same
    /// verification-key element. Those partial Miller loops are computed once,
    /// cached by the child-side tree address, and reused. A cached loop is only
    /// reused when the claim's proof element equals the one it was computed for.
    ///
    /// # Errors
    ///
    /// - [`VcsError::SizeMismatch`] if the input slices differ in length or a
    ///   proof is not `L` elements long
    /// - [`VcsError::Domain`] if an index is out of range
    #[instrument(level = "info", skip_all, fields(claims = indices.len()))]
    pub fn verify_memoized(
        &self,
        digest: &E::G1,
        indices: &[u64],
        values: &[E::ScalarField],
        proofs: &[Vec<E::G1>],
    ) -> Result<MemoizedVerification, VcsError> {
        if values.len() != indices.len() {
            return Err(VcsError::size_mismatch(
                "memoized values",
                indices.len(),
                values.len(),
            ));
        }
        if proofs.len() != indices.len() {
            return Err(VcsError::size_mismatch(
                "memoized proofs",
                indices.len(),
                proofs.len(),
            ));
        }
        for (index, proof) in indices.iter().zip(proofs) {
            self.check_claim(*index, proof)?;
        }

        let height = self.params.height;
        let mut cache: HashMap<TreeAddress, (E::G1Affine, E::TargetField)> = HashMap::new();
        let mut valid = true;

        for ((index, value), proof) in indices.iter().zip(values).zip(proofs) {
            let proof = E::G1::normalize_batch(proof);
            let mut acc = E::TargetField::one();

            for level in (1..=height).rev() {
                let slot = (height - level) as usize;
                let address = TreeAddress::new(level, index >> slot);
                let element = proof[slot];
                let cached = cache
                    .get(&address)
                    .map(|(seen, partial)| (*seen == element, *partial));
                match cached {
                    Some((true, partial)) => acc *= partial,
                    cached => {
                        let bit = (index >> slot) & 1 == 1;
                        let partial = E::miller_loop(element, self.vrk.select(slot, bit)).0;
                        acc *= &partial;
                        if cached.is_none() {
                            cache.insert(address, (element, partial));
                        }
                    }
                }
            }

            let closing = self.closing_term(digest, value).into_affine();
            acc *= E::miller_loop(closing, self.params.h).0;
            valid &= is_identity::<E>(MillerLoopOutput(acc));
        }

        debug!(unique_nodes = cache.len(), valid, "memoized batch checked");
        Ok(MemoizedVerification {
            valid,
            unique_nodes: cache.len(),
        })
    }

    /// Checks an opening-key path for `index` against the verification key.
    ///
    /// Each step must satisfy
    /// `e(path[i], H) == e(path[i - 1], bit_i ? H^{s_i} : H^{1 - s_i})` with
    /// `path[-1] = G`. All steps are folded into one pairing product with
    /// random weights.
    pub fn verify_opening_path<R: RngCore>(
        &self,
        index: u64,
        path: &[E::G1Affine],
        rng: &mut R,
    ) -> Result<bool, VcsError> {
        self.params.check_index(index)?;
        let height = self.params.height as usize;
        if path.len() != height {
            return Err(VcsError::size_mismatch("opening-key path", height, path.len()));
        }

        let mut folded = E::G1::zero();
        let mut g1 = Vec::with_capacity(height + 1);
        let mut g2 = Vec::with_capacity(height + 1);
        for (level, element) in path.iter().enumerate() {
            let weight = E::ScalarField::rand(rng);
            let previous = if level == 0 { self.params.g } else { path[level - 1] };
            folded += *element * weight;
            g1.push(-(previous * weight));
            g2.push(if (index >> level) & 1 == 1 {
                self.vrk.positive[level]
            } else {
                self.vrk.complement[level]
            });
        }
        g1.push(folded);
        g2.push(self.params.h);

        Ok(is_identity(E::multi_miller_loop(
            E::G1::normalize_batch(&g1),
            g2,
        )))
    }

    fn check_claim(&self, index: u64, proof: &[E::G1]) -> Result<(), VcsError> {
        self.params.check_index(index)?;
        let height = self.params.height as usize;
        if proof.len() != height {
            return Err(VcsError::size_mismatch("opening proof", height, proof.len()));
        }
        Ok(())
    }

    /// `G^value - digest`, paired with `H`.
    fn closing_term(&self, digest: &E::G1, value: &E::ScalarField) -> E::G1 {
        self.params.g.into_group() * value - digest
    }
}

fn is_identity<E: Pairing>(loop_output: MillerLoopOutput<E>) -> bool {
    E::final_exponentiation(loop_output)
        .map(|out| out.0.is_one())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{get_proof_path, OpeningKeySource, VcsConfig};
    use ark_bls12_381::{Bls12_381, Fr};
    use rand::{rngs::StdRng, SeedableRng};

    type G1 = <Bls12_381 as Pairing>::G1;

    fn instance(height: u8, seed: u64) -> (Vcs<Bls12_381>, Vec<Fr>, G1, crate::DenseProofTree<Bls12_381>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let (vcs, _) = Vcs::<Bls12_381>::setup(&mut rng, VcsConfig::new(height)).unwrap();
        let vector: Vec<Fr> = (0..1u64 << height).map(|_| Fr::rand(&mut rng)).collect();
        let (digest, tree) = vcs.commit_and_open(&vector).unwrap();
        (vcs, vector, digest, tree)
    }

    #[test]
    fn wrong_value_or_index_fails() {
        let (vcs, vector, digest, tree) = instance(4, 21);
        let proof = get_proof_path(&tree, 6).unwrap();
        assert!(vcs.verify(&digest, 6, &vector[6], &proof).unwrap());
        assert!(!vcs.verify(&digest, 6, &(vector[6] + Fr::one()), &proof).unwrap());
        assert!(!vcs.verify(&digest, 7, &vector[6], &proof).unwrap());
        assert!(!vcs.verify(&(digest + digest), 6, &vector[6], &proof).unwrap());
    }

    #[test]
    fn malformed_claims_are_errors() {
        let (vcs, vector, digest, tree) = instance(4, 22);
        let proof = get_proof_path(&tree, 3).unwrap();
        assert!(matches!(
            vcs.verify(&digest, 3, &vector[3], &proof[..3]),
            Err(VcsError::SizeMismatch { expected: 4, found: 3, .. })
        ));
        assert!(matches!(
            vcs.verify(&digest, 16, &vector[3], &proof),
            Err(VcsError::Domain(_))
        ));
        assert!(matches!(
            vcs.verify_memoized(&digest, &[3, 4], &[vector[3]], &[proof.clone(), proof]),
            Err(VcsError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn memoized_rejects_a_single_bad_claim() {
        let (vcs, vector, digest, tree) = instance(4, 23);
        let indices = [0u64, 1, 2, 9];
        let mut values: Vec<Fr> = indices.iter().map(|i| vector[*i as usize]).collect();
        let proofs: Vec<Vec<G1>> = indices
            .iter()
            .map(|i| get_proof_path(&tree, *i).unwrap())
            .collect();
        assert!(vcs.verify_memoized(&digest, &indices, &values, &proofs).unwrap().valid);

        values[2] += Fr::one();
        let outcome = vcs.verify_memoized(&digest, &indices, &values, &proofs).unwrap();
        assert!(!outcome.valid);
    }

    #[test]
    fn memoized_does_not_reuse_mismatched_elements() {
        let (vcs, vector, digest, tree) = instance(3, 24);
        let good = get_proof_path(&tree, 0).unwrap();
        // Same path as index 0 except the leaf-adjacent element.
        let mut forged = get_proof_path(&tree, 1).unwrap();
        forged[1] += vcs.params().g.into_group();

        let outcome = vcs
            .verify_memoized(&digest, &[0, 1], &[vector[0], vector[1]], &[good, forged])
            .unwrap();
        assert!(!outcome.valid);
    }

    #[test]
    fn opening_paths_check_against_the_verification_key() {
        let mut rng = StdRng::seed_from_u64(25);
        let (vcs, _) = Vcs::<Bls12_381>::setup(&mut rng, VcsConfig::new(5)).unwrap();
        let upk = vcs.opening_key().unwrap();
        for index in [0u64, 1, 17, 31] {
            let path = upk.opening_path(index).unwrap();
            assert!(vcs.verify_opening_path(index, &path, &mut rng).unwrap());
        }

        let mut path = upk.opening_path(17).unwrap();
        assert!(!vcs.verify_opening_path(16, &path, &mut rng).unwrap());
        path[2] = (path[2] + vcs.params().g).into_affine();
        assert!(!vcs.verify_opening_path(17, &path, &mut rng).unwrap());
        assert!(matches!(
            vcs.verify_opening_path(17, &path[..4], &mut rng),
            Err(VcsError::SizeMismatch { .. })
        ));
    }
}
