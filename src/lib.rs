//! Hyperproofs: aggregatable and updatable vector commitments.
//!
//! A vector of `2^L` scalars is committed to a single G1 element. Every
//! position has an opening proof of `L` group elements, all of which are
//! stored together in a binary proof tree. When entries change, the digest and
//! the proof tree are patched in place using only public key material, and
//! many updates are folded so that each touched tree node costs one
//! multi-scalar multiplication. Openings against the same digest can be
//! compressed into one aggregate proof through an [`Aggregator`].
//!
//! The crate is generic over any [`ark_ec::pairing::Pairing`]; the CLI and
//! the tests use BLS12-381.
//!
//! ```rust,no_run
//! # use hyperproofs::*;
//! # use ark_bls12_381::{Bls12_381, Fr};
//! # fn example() -> Result<(), VcsError> {
//! let mut rng = rand::thread_rng();
//! let (vcs, _trapdoors) = Vcs::<Bls12_381>::setup(&mut rng, VcsConfig::new(10))?;
//!
//! let vector: Vec<Fr> = random_vector(&mut rng, 1 << 10);
//! let (mut digest, mut tree) = vcs.commit_and_open(&vector)?;
//! let proof = get_proof_path(&tree, 17)?;
//! assert!(vcs.verify(&digest, 17, &vector[17], &proof)?);
//!
//! let delta = Fr::from(5u64);
//! vcs.update_proof_tree_bulk(&mut tree, &[17, 400], &[delta, delta])?;
//! vcs.update_digest_batch(&mut digest, &[17, 400], &[delta, delta])?;
//! # Ok(())
//! # }
//! ```

pub mod cli;

mod aggregation;
mod commitment;
mod config;
mod constants;
mod errors;
mod keys;
mod pool;
mod proof_tree;
mod serde;
mod setup;
mod simulate;
mod storage;
mod tree;
mod updater;
mod utils;
mod vcs;
mod verifier;

pub use aggregation::*;
pub use commitment::get_proof_path;
pub use config::*;
pub use constants::*;
pub use errors::*;
pub use keys::*;
pub use pool::{run_sharded, shard_ranges};
pub use proof_tree::*;
pub use crate::serde::*;
pub use setup::{generate_opening_key, sample_trapdoors};
pub use simulate::*;
pub use storage::*;
pub use tree::*;
pub use utils::{next_pow2, random_indices, random_vector};
pub use vcs::*;
pub use verifier::*;

#[cfg(test)]
mod tests;
