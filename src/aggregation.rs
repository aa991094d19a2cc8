//! Aggregation of many openings into one proof.
//!
//! A batch of `T` openings against the same digest is a system of `T` pairing
//! equations, row `t` reading
//!
//! ```text
//! prod_{i < L} e(A[t*L + i], B[t*L + i]) == e(P[t], Q[t])
//! ```
//!
//! with `A` the concatenated proofs, `B` the matching verification-key
//! elements, `P[t] = digest - G^value_t` and `Q[t] = H`. The adapter lays
//! these vectors out (padded with identities to the sizes the aggregation
//! protocol expects) and hands them to an [`Aggregator`].

use ark_ec::pairing::Pairing;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{One, Zero};
use ark_serialize::CanonicalSerialize;
use tracing::{debug, instrument};

use crate::config::validate_height;
use crate::utils::{hash_to_scalar, next_pow2};
use crate::{VcsError, VcsParams, VerificationKey, MAX_AGG_SIZE};

/// Dimensions of the aggregation input vectors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AggregationShape {
    /// Tree height `L`, the number of proof elements per opening
    pub height: u8,
    /// Number of openings per aggregate proof
    pub txn_limit: usize,
    /// Length of `P` and `Q`: `txn_limit` plus row padding
    pub rows: usize,
    /// Length of `A` and `B`: `L * txn_limit` rounded up to a power of two
    pub padded_size: usize,
}

impl AggregationShape {
    /// # Errors
    ///
    /// [`VcsError::Domain`] for a height outside `1..MAX_HEIGHT`;
    /// [`VcsError::InvalidConfig`] if `txn_limit` is zero or the padded size
    /// exceeds [`MAX_AGG_SIZE`].
    pub fn new(height: u8, txn_limit: usize) -> Result<Self, VcsError> {
        validate_height(height)?;
        if txn_limit == 0 {
            return Err(VcsError::InvalidConfig("txn_limit must be > 0".into()));
        }
        let elements = (height as usize)
            .checked_mul(txn_limit)
            .ok_or_else(|| VcsError::InvalidConfig("aggregation size overflows".into()))?;
        let padded_size = next_pow2(elements);
        if padded_size > MAX_AGG_SIZE {
            return Err(VcsError::InvalidConfig(format!(
                "aggregation size {} exceeds {}",
                padded_size, MAX_AGG_SIZE
            )));
        }
        Ok(Self {
            height,
            txn_limit,
            rows: padded_size.div_ceil(height as usize),
            padded_size,
        })
    }

    /// Identity rows appended to `P` and `Q`.
    pub fn row_padding(&self) -> usize {
        self.rows - self.txn_limit
    }

    /// Identity elements appended to `A` and `B`.
    pub fn element_padding(&self) -> usize {
        self.padded_size - self.height as usize * self.txn_limit
    }
}

/// Batch-aggregation protocol for pairing-product equations.
///
/// `prove` commits to `A` (against `B`); `verify` checks the committed
/// products against `P` and `Q` row by row.
pub trait Aggregator<E: Pairing> {
    type Key;
    type Proof;

    fn prove(
        &self,
        shape: &AggregationShape,
        key: &Self::Key,
        a: &[E::G1Affine],
        b: &[E::G2Affine],
    ) -> Result<Self::Proof, VcsError>;

    fn verify(
        &self,
        shape: &AggregationShape,
        key: &Self::Key,
        p: &[E::G1Affine],
        q: &[E::G2Affine],
        b: &[E::G2Affine],
        proof: &Self::Proof,
    ) -> Result<bool, VcsError>;
}

/// Reshapes openings into aggregator inputs.
pub struct AggregationAdapter<E: Pairing, A: Aggregator<E>> {
    shape: AggregationShape,
    params: VcsParams<E>,
    vrk: VerificationKey<E>,
    aggregator: A,
    key: A::Key,
}

impl<E: Pairing, A: Aggregator<E>> AggregationAdapter<E, A> {
    pub fn new(
        txn_limit: usize,
        params: VcsParams<E>,
        vrk: VerificationKey<E>,
        aggregator: A,
        key: A::Key,
    ) -> Result<Self, VcsError> {
        let shape = AggregationShape::new(params.height, txn_limit)?;
        debug!(
            rows = shape.rows,
            padded_size = shape.padded_size,
            "aggregation shape"
        );
        Ok(Self {
            shape,
            params,
            vrk,
            aggregator,
            key,
        })
    }

    pub fn shape(&self) -> &AggregationShape {
        &self.shape
    }

    /// Aggregates exactly `txn_limit` openings.
    ///
    /// # Errors
    ///
    /// [`VcsError::SizeMismatch`] if the number of indices or proofs is not
    /// `txn_limit` or a proof is not `L` elements long; [`VcsError::Domain`]
    /// for an out-of-range index.
    #[instrument(level = "info", skip_all, fields(txn_limit = self.shape.txn_limit))]
    pub fn agg_prove(&self, indices: &[u64], proofs: &[Vec<E::G1>]) -> Result<A::Proof, VcsError> {
        self.check_count("aggregated indices", indices.len())?;
        self.check_count("aggregated proofs", proofs.len())?;
        let height = self.shape.height as usize;

        let mut a = Vec::with_capacity(self.shape.padded_size);
        for proof in proofs {
            if proof.len() != height {
                return Err(VcsError::size_mismatch("opening proof", height, proof.len()));
            }
            a.extend(E::G1::normalize_batch(proof));
        }
        a.resize(self.shape.padded_size, E::G1Affine::zero());

        let b = self.build_b(indices)?;
        self.aggregator.prove(&self.shape, &self.key, &a, &b)
    }

    /// Verifies an aggregate proof for exactly `txn_limit` claimed entries.
    #[instrument(level = "info", skip_all, fields(txn_limit = self.shape.txn_limit))]
    pub fn agg_verify(
        &self,
        proof: &A::Proof,
        digest: &E::G1,
        indices: &[u64],
        values: &[E::ScalarField],
    ) -> Result<bool, VcsError> {
        self.check_count("aggregated indices", indices.len())?;
        self.check_count("aggregated values", values.len())?;

        let g = self.params.g.into_group();
        let mut p: Vec<E::G1> = values.iter().map(|value| *digest - g * value).collect();
        p.resize(self.shape.rows, E::G1::zero());
        let p = E::G1::normalize_batch(&p);

        let mut q = vec![self.params.h; self.shape.txn_limit];
        q.resize(self.shape.rows, E::G2Affine::zero());

        let b = self.build_b(indices)?;
        self.aggregator
            .verify(&self.shape, &self.key, &p, &q, &b, proof)
    }

    fn build_b(&self, indices: &[u64]) -> Result<Vec<E::G2Affine>, VcsError> {
        let height = self.shape.height as usize;
        let mut b = Vec::with_capacity(self.shape.padded_size);
        for index in indices {
            self.params.check_index(*index)?;
            b.extend((0..height).map(|level| self.vrk.select(level, (index >> level) & 1 == 1)));
        }
        b.resize(self.shape.padded_size, E::G2Affine::zero());
        Ok(b)
    }

    fn check_count(&self, context: &'static str, found: usize) -> Result<(), VcsError> {
        if found != self.shape.txn_limit {
            return Err(VcsError::size_mismatch(context, self.shape.txn_limit, found));
        }
        Ok(())
    }
}

/// Aggregate proof of [`TransparentAggregator`]: the `A` vector itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransparentProof<E: Pairing> {
    pub a: Vec<E::G1Affine>,
}

/// Reference aggregator that ships `A` in the clear.
///
/// Verification folds every row equation into one multi-pairing using
/// Fiat-Shamir weights bound to the key, `A` and `P`. The proof is as large
/// as the input, so this only stands in for a succinct inner-pairing-product
/// argument.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransparentAggregator;

impl<E: Pairing> Aggregator<E> for TransparentAggregator {
    /// Domain-separation seed for the transcript
    type Key = [u8; 32];
    type Proof = TransparentProof<E>;

    fn prove(
        &self,
        shape: &AggregationShape,
        _key: &Self::Key,
        a: &[E::G1Affine],
        b: &[E::G2Affine],
    ) -> Result<Self::Proof, VcsError> {
        if a.len() != shape.padded_size {
            return Err(VcsError::size_mismatch("aggregation A", shape.padded_size, a.len()));
        }
        if b.len() != shape.padded_size {
            return Err(VcsError::size_mismatch("aggregation B", shape.padded_size, b.len()));
        }
        Ok(TransparentProof { a: a.to_vec() })
    }

    fn verify(
        &self,
        shape: &AggregationShape,
        key: &Self::Key,
        p: &[E::G1Affine],
        q: &[E::G2Affine],
        b: &[E::G2Affine],
        proof: &Self::Proof,
    ) -> Result<bool, VcsError> {
        for (context, len, expected) in [
            ("aggregation A", proof.a.len(), shape.padded_size),
            ("aggregation B", b.len(), shape.padded_size),
            ("aggregation P", p.len(), shape.rows),
            ("aggregation Q", q.len(), shape.rows),
        ] {
            if len != expected {
                return Err(VcsError::size_mismatch(context, expected, len));
            }
        }

        let weights = row_weights::<E>(key, &proof.a, p, shape.rows)?;
        let height = shape.height as usize;

        let mut g1: Vec<E::G1> = Vec::with_capacity(shape.padded_size + shape.rows);
        let mut g2: Vec<E::G2Affine> = Vec::with_capacity(shape.padded_size + shape.rows);
        for (j, (a_j, b_j)) in proof.a.iter().zip(b).enumerate() {
            if a_j.is_zero() || b_j.is_zero() {
                continue;
            }
            g1.push(*a_j * weights[j / height]);
            g2.push(*b_j);
        }
        for ((p_t, q_t), weight) in p.iter().zip(q).zip(&weights) {
            if p_t.is_zero() || q_t.is_zero() {
                continue;
            }
            g1.push(-(*p_t * weight));
            g2.push(*q_t);
        }

        let product = E::multi_miller_loop(E::G1::normalize_batch(&g1), g2);
        Ok(E::final_exponentiation(product)
            .map(|out| out.0.is_one())
            .unwrap_or(false))
    }
}

fn row_weights<E: Pairing>(
    key: &[u8; 32],
    a: &[E::G1Affine],
    p: &[E::G1Affine],
    rows: usize,
) -> Result<Vec<E::ScalarField>, VcsError> {
    let mut transcript = Vec::with_capacity(32 + (a.len() + p.len()) * 96);
    transcript.extend_from_slice(b"hyperproofs/transparent-aggregation");
    transcript.extend_from_slice(key);
    a.serialize_compressed(&mut transcript)?;
    p.serialize_compressed(&mut transcript)?;
    let seed = blake3::hash(&transcript);

    Ok((0..rows as u64)
        .map(|row| {
            let mut input = seed.as_bytes().to_vec();
            input.extend_from_slice(&row.to_le_bytes());
            let weight: E::ScalarField = hash_to_scalar(&input);
            if weight.is_zero() {
                E::ScalarField::one()
            } else {
                weight
            }
        })
        .collect())
}
