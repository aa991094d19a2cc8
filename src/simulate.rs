//! Trapdoor-assisted instances for heights too large to commit densely.
//!
//! With the trapdoors in hand, a valid opening can be produced without the
//! vector: pick the digest exponent `f` and a random exponent `q` for every
//! proof node on the sampled paths, then solve the verification equation for
//! the value, `value = f - sum_l q_l * (bit_l ? s_l - 1 : s_l)`. Openings
//! that share a node share its exponent, so the result behaves like a real
//! tree on every path it touches: it verifies, updates and aggregates.

use std::collections::HashMap;

use ark_ec::pairing::Pairing;
use ark_ec::AffineRepr;
use ark_ff::{UniformRand, Zero};
use rand_core::RngCore;
use tracing::{info, instrument};

use crate::tree::TreeAddress;
use crate::utils::random_indices;
use crate::{
    get_proof_path, OpeningKeySource, SparseProofTree, TrapdoorPathSource, Trapdoors, VcsError,
    VcsParams,
};

/// Openings sampled from a simulated instance.
#[derive(Clone, Debug)]
pub struct SimulatedInstance<E: Pairing> {
    pub digest: E::G1,
    /// Sampled positions; may repeat
    pub indices: Vec<u64>,
    pub values: Vec<E::ScalarField>,
    pub proofs: Vec<Vec<E::G1>>,
    /// Opening-key paths of the sampled positions
    pub opening_keys: HashMap<u64, Vec<E::G1Affine>>,
    /// Every proof node on the sampled paths
    pub tree: SparseProofTree<E>,
}

/// Samples `count` openings of a random instance of height `params.height`.
///
/// # Errors
///
/// [`VcsError::KeyMaterialIncomplete`] if fewer than `L` trapdoors are given.
#[instrument(level = "info", skip_all, fields(height = params.height, count))]
pub fn simulate_sparse_instance<E: Pairing, R: RngCore>(
    params: &VcsParams<E>,
    trapdoors: &Trapdoors<E>,
    rng: &mut R,
    count: usize,
) -> Result<SimulatedInstance<E>, VcsError> {
    let height = params.height;
    if trapdoors.height() < height {
        return Err(VcsError::KeyMaterialIncomplete {
            context: "trapdoor levels".into(),
            expected: height as u64,
            found: trapdoors.height() as u64,
        });
    }
    let g = params.g.into_group();
    let digest_exponent = E::ScalarField::rand(rng);
    let indices = random_indices(rng, height, count);

    let mut exponents: HashMap<TreeAddress, E::ScalarField> = HashMap::new();
    let mut values = Vec::with_capacity(count);
    for index in &indices {
        let mut id = *index;
        let mut rhs = E::ScalarField::zero();
        for level in 0..height as usize {
            id >>= 1;
            let address = TreeAddress::new(height - level as u8 - 1, id);
            let q = *exponents
                .entry(address)
                .or_insert_with(|| E::ScalarField::rand(rng));
            let factor = if (index >> level) & 1 == 1 {
                trapdoors.s_minus_one[level]
            } else {
                trapdoors.s[level]
            };
            rhs += q * factor;
        }
        values.push(digest_exponent - rhs);
    }

    let mut tree = SparseProofTree::new(height);
    for (address, q) in exponents {
        tree.insert_node(address, g * q)?;
    }
    let proofs = indices
        .iter()
        .map(|index| get_proof_path(&tree, *index))
        .collect::<Result<Vec<_>, VcsError>>()?;

    let source = TrapdoorPathSource { params, trapdoors };
    let mut opening_keys = HashMap::new();
    for index in &indices {
        if !opening_keys.contains_key(index) {
            opening_keys.insert(*index, source.opening_path(*index)?);
        }
    }

    info!(nodes = tree.len(), unique_indices = opening_keys.len(), "simulated instance");
    Ok(SimulatedInstance {
        digest: g * digest_exponent,
        indices,
        values,
        proofs,
        opening_keys,
        tree,
    })
}
