//! Key generation.
//!
//! A setup samples the trapdoors `s_0..s_{L-1}` and derives from them:
//!
//! - the **verification key**, `3L` elements of G2, small enough to ship to
//!   every verifier;
//! - the **opening key**, a perfect binary tree of `2^(L+1) - 1` elements of
//!   G1 that commitments, openings and updates are computed against.
//!
//! The opening key dominates the cost. Its nodes are computed in level order,
//! split into `config.shards` contiguous ranges, by at most `config.workers`
//! threads at a time.
//!
//! The trapdoors are returned to the caller. They are secret: anyone holding
//! them can forge openings. They are only needed to persist a setup for later
//! reuse or to simulate instances too large for a dense tree.

use ark_ec::pairing::Pairing;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{One, UniformRand};
use rand_core::RngCore;
use tracing::{debug, info, instrument};

use crate::keys::is_degenerate_trapdoor;
use crate::pool::run_sharded;
use crate::tree::tree_node_count;
use crate::{OpeningKey, Trapdoors, Vcs, VcsConfig, VcsError, VcsParams, VerificationKey};

impl<E: Pairing> Vcs<E> {
    /// Generates fresh parameters and keys for `config.height`.
    ///
    /// # Arguments
    ///
    /// * `rng` - Cryptographically secure random number generator
    /// * `config` - Height and worker-pool settings
    ///
    /// # Returns
    ///
    /// The engine (with a dense opening key) and the trapdoors it was built from.
    ///
    /// # Errors
    ///
    /// - [`VcsError::Domain`] if the height is 0 or at least [`crate::MAX_HEIGHT`]
    /// - [`VcsError::InvalidConfig`] if the worker pool is empty
    #[instrument(level = "info", skip_all, fields(height = config.height, shards = config.shards))]
    pub fn setup<R: RngCore>(
        rng: &mut R,
        config: VcsConfig,
    ) -> Result<(Self, Trapdoors<E>), VcsError> {
        let (mut vcs, trapdoors) = Self::setup_without_opening_key(rng, config)?;
        let upk = generate_opening_key(
            &vcs.params,
            &trapdoors,
            vcs.config.shards,
            vcs.config.workers,
        )?;
        vcs.upk = Some(upk);
        Ok((vcs, trapdoors))
    }

    /// Generates parameters, trapdoors and the verification key only.
    ///
    /// For heights where the opening key does not fit in memory. Opening-key
    /// paths are then derived per index with [`crate::TrapdoorPathSource`].
    #[instrument(level = "info", skip_all, fields(height = config.height))]
    pub fn setup_without_opening_key<R: RngCore>(
        rng: &mut R,
        config: VcsConfig,
    ) -> Result<(Self, Trapdoors<E>), VcsError> {
        config.validate()?;
        let params = VcsParams::<E>::new(
            config.height,
            E::G1Affine::generator(),
            E::G2Affine::generator(),
        )?;
        let trapdoors = sample_trapdoors::<E, R>(rng, config.height);
        let vrk = VerificationKey::from_trapdoors(params.h, &trapdoors);
        info!(height = config.height, "verification key derived");
        let vcs = Self::from_parts(config, params, vrk, None)?;
        Ok((vcs, trapdoors))
    }

    /// Rebuilds an engine from stored trapdoors.
    pub fn from_trapdoors(
        config: VcsConfig,
        params: VcsParams<E>,
        trapdoors: &Trapdoors<E>,
        with_opening_key: bool,
    ) -> Result<Self, VcsError> {
        if trapdoors.height() < params.height {
            return Err(VcsError::KeyMaterialIncomplete {
                context: "trapdoor levels".into(),
                expected: params.height as u64,
                found: trapdoors.height() as u64,
            });
        }
        let vrk = VerificationKey::from_trapdoors(params.h, trapdoors);
        let upk = if with_opening_key {
            Some(generate_opening_key(
                &params,
                trapdoors,
                config.shards,
                config.workers,
            )?)
        } else {
            None
        };
        Self::from_parts(config, params, vrk, upk)
    }
}

/// Samples `height` trapdoors, rejecting 0 and 1.
///
/// Either value would zero out half of the opening key.
pub fn sample_trapdoors<E: Pairing, R: RngCore>(rng: &mut R, height: u8) -> Trapdoors<E> {
    let s = (0..height)
        .map(|_| loop {
            let candidate = E::ScalarField::rand(rng);
            if !is_degenerate_trapdoor(&candidate) {
                break candidate;
            }
        })
        .collect();
    Trapdoors::from_secrets(s)
}

/// Computes the dense opening key for `params.height` with the worker pool.
#[instrument(level = "debug", skip_all, fields(height = params.height, shards, workers))]
pub fn generate_opening_key<E: Pairing>(
    params: &VcsParams<E>,
    trapdoors: &Trapdoors<E>,
    shards: usize,
    workers: usize,
) -> Result<OpeningKey<E>, VcsError> {
    let exponents = opening_key_exponents(params.height, trapdoors)?;
    let g = params.g.into_group();
    let total = exponents.len() as u64;

    let chunks = run_sharded(total, shards, workers, |shard, range| {
        let points: Vec<E::G1> = exponents[range.start as usize..range.end as usize]
            .iter()
            .map(|exp| g * exp)
            .collect();
        debug!(shard, first = range.start, count = points.len(), "opening key shard");
        Ok(E::G1::normalize_batch(&points))
    })?;

    OpeningKey::from_level_order(params.height, chunks.into_iter().flatten().collect())
}

/// Exponents of the opening-key tree in level order.
///
/// Level `i + 1` extends each level-`i` exponent by `1 - s_i` (bit `i` clear)
/// or `s_i` (bit `i` set).
fn opening_key_exponents<E: Pairing>(
    height: u8,
    trapdoors: &Trapdoors<E>,
) -> Result<Vec<E::ScalarField>, VcsError> {
    if trapdoors.height() < height {
        return Err(VcsError::KeyMaterialIncomplete {
            context: "trapdoor levels".into(),
            expected: height as u64,
            found: trapdoors.height() as u64,
        });
    }
    let mut exponents = Vec::with_capacity(tree_node_count(height) as usize);
    exponents.push(E::ScalarField::one());
    for level in 0..height as usize {
        let start = (1usize << level) - 1;
        for position in 0..(1usize << (level + 1)) {
            let parent = exponents[start + (position & ((1usize << level) - 1))];
            let factor = if (position >> level) & 1 == 1 {
                trapdoors.s[level]
            } else {
                trapdoors.one_minus_s[level]
            };
            exponents.push(parent * factor);
        }
    }
    Ok(exponents)
}
