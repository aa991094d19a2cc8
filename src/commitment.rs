//! Digests and openings.
//!
//! A vector `a` of length `2^L` is committed as the multi-scalar multiplication
//! of `a` against level `L` of the opening key. The proof tree stores, for
//! every internal range, the commitment to `right half - left half` against
//! the opening-key level one below; a leaf's opening is the `L` nodes on its
//! path.

use ark_ec::pairing::Pairing;
use ark_ec::VariableBaseMSM;
use tracing::{debug, instrument};

use crate::proof_tree::{DenseProofTree, ProofTreeStore};
use crate::tree::{path_addresses, TreeAddress};
use crate::{Vcs, VcsError};

impl<E: Pairing> Vcs<E> {
    /// Commits `values` against opening-key level `level`.
    ///
    /// # Errors
    ///
    /// - [`VcsError::SizeMismatch`] unless `values.len() == 2^level`
    /// - [`VcsError::Domain`] if `level` exceeds the height
    pub fn commit(&self, values: &[E::ScalarField], level: u8) -> Result<E::G1, VcsError> {
        let bases = self.opening_key()?.level(level)?;
        if values.len() != bases.len() {
            return Err(VcsError::size_mismatch(
                "commitment input",
                bases.len(),
                values.len(),
            ));
        }
        msm::<E>(bases, values)
    }

    /// Digest of a full vector.
    #[instrument(level = "debug", skip_all, fields(len = vector.len()))]
    pub fn digest(&self, vector: &[E::ScalarField]) -> Result<E::G1, VcsError> {
        self.check_vector_len(vector)?;
        self.commit(vector, self.params.height)
    }

    /// Builds the proof tree of `vector`.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::SizeMismatch`] unless `vector.len() == 2^L`.
    #[instrument(level = "info", skip_all, fields(height = self.params.height))]
    pub fn open_all(&self, vector: &[E::ScalarField]) -> Result<DenseProofTree<E>, VcsError> {
        self.check_vector_len(vector)?;
        let mut tree = DenseProofTree::new(self.params.height);
        self.open_range(&mut tree, vector, 0, vector.len(), self.params.height)?;
        debug!(nodes = (1u64 << self.params.height) - 1, "proof tree built");
        Ok(tree)
    }

    /// Digest and proof tree in one call.
    pub fn commit_and_open(
        &self,
        vector: &[E::ScalarField],
    ) -> Result<(E::G1, DenseProofTree<E>), VcsError> {
        let digest = self.digest(vector)?;
        let tree = self.open_all(vector)?;
        Ok((digest, tree))
    }

    fn open_range(
        &self,
        tree: &mut DenseProofTree<E>,
        vector: &[E::ScalarField],
        start: usize,
        end: usize,
        height: u8,
    ) -> Result<(), VcsError> {
        if end - start <= 1 {
            return Ok(());
        }
        let mid = start + (end - start) / 2;
        let diff: Vec<E::ScalarField> = (0..mid - start)
            .map(|i| vector[mid + i] - vector[start + i])
            .collect();
        let node = self.commit(&diff, height - 1)?;
        let address = TreeAddress::new(self.params.height - height, (start / (end - start)) as u64);
        tree.set_node(address, node);

        self.open_range(tree, vector, start, mid, height - 1)?;
        self.open_range(tree, vector, mid, end, height - 1)
    }

    fn check_vector_len(&self, vector: &[E::ScalarField]) -> Result<(), VcsError> {
        if vector.len() as u64 != self.params.size {
            return Err(VcsError::size_mismatch(
                "vector",
                self.params.size as usize,
                vector.len(),
            ));
        }
        Ok(())
    }
}

/// Reads the opening proof of `index` from a proof tree, leaf-adjacent first.
pub fn get_proof_path<E: Pairing, T: ProofTreeStore<E>>(
    tree: &T,
    index: u64,
) -> Result<Vec<E::G1>, VcsError> {
    path_addresses(index, tree.height())?
        .into_iter()
        .map(|address| tree.node(address))
        .collect()
}

pub(crate) fn msm<E: Pairing>(
    bases: &[E::G1Affine],
    scalars: &[E::ScalarField],
) -> Result<E::G1, VcsError> {
    E::G1::msm(bases, scalars).map_err(|len| {
        VcsError::Backend(format!(
            "multi-scalar multiplication over {} bases and {} scalars (stopped at {})",
            bases.len(),
            scalars.len(),
            len
        ))
    })
}
