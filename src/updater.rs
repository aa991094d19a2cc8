//! Updates to digests, held proofs and proof trees.
//!
//! Changing entry `u` by `delta` moves the digest by `delta * UPK[L][u]` and
//! every proof-tree node on `u`'s path by `+-delta` times one opening-key
//! element. Proof slot `j` (node `(L - 1 - j, u >> (j + 1))`) uses
//! `UPK[j][u mod 2^j]`, which is entry `j - 1` of `u`'s opening-key path, or `G`
//! for `j = 0`. The sign is `+` when bit `j` of `u` is set (`u` sits in the
//! right half of the node) and `-` otherwise.
//!
//! A proof held for a different index `l` shares the nodes above the level
//! where `u` and `l` diverge. Walking from the root, slots where the bits of
//! `u` and `l` agree are updated and the walk continues; at the first slot
//! where they differ the node is updated and the walk stops.
//!
//! Every variant exists twice: once against the engine's dense opening key
//! and once (`*_with`) against any [`OpeningKeySource`], which is how sparse
//! instances are updated.

use std::collections::{BTreeMap, HashMap};

use ark_ec::pairing::Pairing;
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::commitment::msm;
use crate::proof_tree::ProofTreeStore;
use crate::tree::TreeAddress;
use crate::{OpeningKeySource, Vcs, VcsError};

/// One signed opening-key multiple to add into a proof slot.
#[derive(Clone, Copy, Debug)]
struct Contribution<A> {
    slot: usize,
    address: TreeAddress,
    basis: A,
    add: bool,
}

impl<E: Pairing> Vcs<E> {
    /// Updates a proof held for `local_index` after entry `update_index`
    /// changed by `delta`.
    ///
    /// # Errors
    ///
    /// - [`VcsError::SizeMismatch`] if `proof.len() != L`
    /// - [`VcsError::Domain`] if either index is out of range
    pub fn update_proof(
        &self,
        proof: &[E::G1],
        local_index: u64,
        update_index: u64,
        delta: &E::ScalarField,
    ) -> Result<Vec<E::G1>, VcsError> {
        self.update_proof_with(self.opening_key()?, proof, local_index, update_index, delta)
    }

    pub fn update_proof_with<S: OpeningKeySource<E>>(
        &self,
        source: &S,
        proof: &[E::G1],
        local_index: u64,
        update_index: u64,
        delta: &E::ScalarField,
    ) -> Result<Vec<E::G1>, VcsError> {
        self.params.check_index(local_index)?;
        let height = self.params.height as usize;
        if proof.len() != height {
            return Err(VcsError::size_mismatch("opening proof", height, proof.len()));
        }
        let path = self.checked_path(source, update_index)?;

        let mut updated = proof.to_vec();
        for c in self.contributions(&path, update_index, local_index) {
            let term = c.basis * delta;
            if c.add {
                updated[c.slot] += term;
            } else {
                updated[c.slot] -= term;
            }
        }
        Ok(updated)
    }

    /// Applies one entry change to every node on its path.
    #[instrument(level = "debug", skip_all, fields(index))]
    pub fn update_proof_tree<T: ProofTreeStore<E>>(
        &self,
        tree: &mut T,
        index: u64,
        delta: &E::ScalarField,
    ) -> Result<(), VcsError> {
        self.update_proof_tree_with(self.opening_key()?, tree, index, delta)
    }

    pub fn update_proof_tree_with<S: OpeningKeySource<E>, T: ProofTreeStore<E>>(
        &self,
        source: &S,
        tree: &mut T,
        index: u64,
        delta: &E::ScalarField,
    ) -> Result<(), VcsError> {
        self.check_tree_height(tree)?;
        let path = self.checked_path(source, index)?;
        let contributions = self.contributions(&path, index, index);
        check_materialized(tree, contributions.iter().map(|c| c.address))?;

        for c in contributions {
            let term = c.basis * delta;
            tree.add_to_node(c.address, if c.add { term } else { -term })?;
        }
        Ok(())
    }

    /// Applies many entry changes at once.
    ///
    /// Contributions are grouped by tree node so each touched node costs one
    /// multi-scalar multiplication; the groups are evaluated in parallel.
    /// Repeated indices are allowed and accumulate. The result equals applying
    /// [`Vcs::update_proof_tree`] once per entry.
    ///
    /// # Returns
    ///
    /// The number of distinct nodes touched.
    ///
    /// # Errors
    ///
    /// - [`VcsError::SizeMismatch`] if `indices` and `deltas` differ in length
    /// - [`VcsError::Domain`] for an out-of-range index or a node the tree
    ///   does not hold; the tree is left untouched
    #[instrument(level = "info", skip_all, fields(updates = indices.len()))]
    pub fn update_proof_tree_bulk<T: ProofTreeStore<E>>(
        &self,
        tree: &mut T,
        indices: &[u64],
        deltas: &[E::ScalarField],
    ) -> Result<usize, VcsError> {
        self.update_proof_tree_bulk_with(self.opening_key()?, tree, indices, deltas)
    }

    #[instrument(level = "info", skip_all, fields(updates = indices.len()))]
    pub fn update_proof_tree_bulk_with<S: OpeningKeySource<E>, T: ProofTreeStore<E>>(
        &self,
        source: &S,
        tree: &mut T,
        indices: &[u64],
        deltas: &[E::ScalarField],
    ) -> Result<usize, VcsError> {
        if deltas.len() != indices.len() {
            return Err(VcsError::size_mismatch(
                "update deltas",
                indices.len(),
                deltas.len(),
            ));
        }
        self.check_tree_height(tree)?;

        let mut paths: HashMap<u64, Vec<E::G1Affine>> = HashMap::new();
        let mut groups: BTreeMap<TreeAddress, (Vec<E::G1Affine>, Vec<E::ScalarField>)> =
            BTreeMap::new();
        for (index, delta) in indices.iter().zip(deltas) {
            if !paths.contains_key(index) {
                paths.insert(*index, self.checked_path(source, *index)?);
            }
            let path = &paths[index];
            for c in self.contributions(path, *index, *index) {
                let (bases, scalars) = groups.entry(c.address).or_default();
                bases.push(c.basis);
                scalars.push(if c.add { *delta } else { -*delta });
            }
        }
        check_materialized(tree, groups.keys().copied())?;

        let sums = groups
            .into_par_iter()
            .map(|(address, (bases, scalars))| Ok((address, msm::<E>(&bases, &scalars)?)))
            .collect::<Result<Vec<_>, VcsError>>()?;
        let unique_nodes = sums.len();
        for (address, sum) in sums {
            tree.add_to_node(address, sum)?;
        }
        debug!(unique_nodes, "bulk update applied");
        Ok(unique_nodes)
    }

    /// Moves `digest` by `delta` at `index`.
    pub fn update_digest(
        &self,
        digest: &mut E::G1,
        index: u64,
        delta: &E::ScalarField,
    ) -> Result<(), VcsError> {
        self.params.check_index(index)?;
        let basis = self.opening_key()?.node(self.params.height, index)?;
        *digest += basis * delta;
        Ok(())
    }

    /// Moves `digest` by every `(index, delta)` pair with one multi-scalar
    /// multiplication.
    #[instrument(level = "debug", skip_all, fields(updates = indices.len()))]
    pub fn update_digest_batch(
        &self,
        digest: &mut E::G1,
        indices: &[u64],
        deltas: &[E::ScalarField],
    ) -> Result<(), VcsError> {
        let upk = self.opening_key()?;
        let bases = indices
            .iter()
            .map(|index| {
                self.params.check_index(*index)?;
                upk.node(self.params.height, *index)
            })
            .collect::<Result<Vec<_>, VcsError>>()?;
        self.apply_digest_delta(digest, &bases, deltas)
    }

    pub fn update_digest_batch_with<S: OpeningKeySource<E>>(
        &self,
        source: &S,
        digest: &mut E::G1,
        indices: &[u64],
        deltas: &[E::ScalarField],
    ) -> Result<(), VcsError> {
        let leaf = self.params.height as usize - 1;
        let bases = indices
            .iter()
            .map(|index| Ok(self.checked_path(source, *index)?[leaf]))
            .collect::<Result<Vec<_>, VcsError>>()?;
        self.apply_digest_delta(digest, &bases, deltas)
    }

    fn apply_digest_delta(
        &self,
        digest: &mut E::G1,
        bases: &[E::G1Affine],
        deltas: &[E::ScalarField],
    ) -> Result<(), VcsError> {
        if deltas.len() != bases.len() {
            return Err(VcsError::size_mismatch(
                "update deltas",
                bases.len(),
                deltas.len(),
            ));
        }
        *digest += msm::<E>(bases, deltas)?;
        Ok(())
    }

    fn checked_path<S: OpeningKeySource<E>>(
        &self,
        source: &S,
        index: u64,
    ) -> Result<Vec<E::G1Affine>, VcsError> {
        self.params.check_index(index)?;
        let path = source.opening_path(index)?;
        let height = self.params.height as usize;
        if path.len() != height {
            return Err(VcsError::size_mismatch("opening-key path", height, path.len()));
        }
        Ok(path)
    }

    fn check_tree_height<T: ProofTreeStore<E>>(&self, tree: &T) -> Result<(), VcsError> {
        if tree.height() != self.params.height {
            return Err(VcsError::Domain(format!(
                "proof tree of height {} used with height {}",
                tree.height(),
                self.params.height
            )));
        }
        Ok(())
    }

    /// Signed contributions of an update at `update_index` to the proof of
    /// `local_index`, root slot first.
    fn contributions(
        &self,
        path: &[E::G1Affine],
        update_index: u64,
        local_index: u64,
    ) -> Vec<Contribution<E::G1Affine>> {
        let height = self.params.height as usize;
        let mut out = Vec::with_capacity(height);
        for slot in (0..height).rev() {
            let update_bit = (update_index >> slot) & 1 == 1;
            let local_bit = (local_index >> slot) & 1 == 1;
            out.push(Contribution {
                slot,
                address: TreeAddress::new((height - 1 - slot) as u8, update_index >> (slot + 1)),
                basis: if slot == 0 { self.params.g } else { path[slot - 1] },
                add: update_bit,
            });
            if update_bit != local_bit {
                break;
            }
        }
        out
    }
}

fn check_materialized<E: Pairing, T: ProofTreeStore<E>>(
    tree: &T,
    addresses: impl IntoIterator<Item = TreeAddress>,
) -> Result<(), VcsError> {
    for address in addresses {
        if !tree.contains(address) {
            return Err(VcsError::Domain(format!(
                "update touches proof tree node ({}, {}) which is not held",
                address.level, address.position
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{get_proof_path, DenseProofTree, VcsConfig};
    use ark_bls12_381::{Bls12_381, Fr};
    use ark_ff::UniformRand;
    use rand::{rngs::StdRng, SeedableRng};

    fn engine(height: u8, seed: u64) -> (Vcs<Bls12_381>, StdRng) {
        let mut rng = StdRng::seed_from_u64(seed);
        let (vcs, _) = Vcs::<Bls12_381>::setup(&mut rng, VcsConfig::new(height)).unwrap();
        (vcs, rng)
    }

    #[test]
    fn single_update_matches_recommit() {
        let (vcs, mut rng) = engine(4, 31);
        let mut vector: Vec<Fr> = (0..16).map(|_| Fr::rand(&mut rng)).collect();
        let (mut digest, mut tree) = vcs.commit_and_open(&vector).unwrap();

        let delta = Fr::rand(&mut rng);
        vcs.update_proof_tree(&mut tree, 11, &delta).unwrap();
        vcs.update_digest(&mut digest, 11, &delta).unwrap();
        vector[11] += delta;

        let (expected_digest, expected_tree) = vcs.commit_and_open(&vector).unwrap();
        assert_eq!(digest, expected_digest);
        assert_eq!(tree, expected_tree);
    }

    #[test]
    fn stop_rule_only_touches_shared_slots() {
        let (vcs, mut rng) = engine(3, 32);
        let vector: Vec<Fr> = (0..8).map(|_| Fr::rand(&mut rng)).collect();
        let tree = vcs.open_all(&vector).unwrap();
        let proof = get_proof_path(&tree, 0).unwrap();

        // 0b000 and 0b100 diverge at the root split: only slot 2 moves.
        let updated = vcs.update_proof(&proof, 0, 4, &Fr::from(5u64)).unwrap();
        assert_eq!(updated[0], proof[0]);
        assert_eq!(updated[1], proof[1]);
        assert_ne!(updated[2], proof[2]);

        // 0b000 and 0b001 share every split.
        let updated = vcs.update_proof(&proof, 0, 1, &Fr::from(5u64)).unwrap();
        assert!(updated.iter().zip(&proof).all(|(a, b)| a != b));
    }

    #[test]
    fn bulk_rejects_before_mutating() {
        let (vcs, mut rng) = engine(3, 33);
        let vector: Vec<Fr> = (0..8).map(|_| Fr::rand(&mut rng)).collect();
        let mut tree: DenseProofTree<Bls12_381> = vcs.open_all(&vector).unwrap();
        let before = tree.clone();

        let result =
            vcs.update_proof_tree_bulk(&mut tree, &[1, 8], &[Fr::from(1u64), Fr::from(2u64)]);
        assert!(matches!(result, Err(VcsError::Domain(_))));
        assert_eq!(tree, before);

        let result = vcs.update_proof_tree_bulk(&mut tree, &[1, 2], &[Fr::from(1u64)]);
        assert!(matches!(result, Err(VcsError::SizeMismatch { .. })));
        assert_eq!(tree, before);
    }

    #[test]
    fn bulk_counts_distinct_nodes() {
        let (vcs, mut rng) = engine(3, 34);
        let vector: Vec<Fr> = (0..8).map(|_| Fr::rand(&mut rng)).collect();
        let mut tree = vcs.open_all(&vector).unwrap();
        // 0 and 1 share all three nodes; 7 adds two more.
        let touched = vcs
            .update_proof_tree_bulk(
                &mut tree,
                &[0, 1, 7],
                &[Fr::from(1u64), Fr::from(2u64), Fr::from(3u64)],
            )
            .unwrap();
        assert_eq!(touched, 5);
    }
}
